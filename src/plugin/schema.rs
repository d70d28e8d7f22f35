use crate::foundation::error::{SceneportError, SceneportResult};
use crate::plugin::desc::PluginDesc;

/// Attribute type as fixed by a plugin schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrType {
    /// Integer / boolean.
    Int,
    /// Float.
    Float,
    /// String.
    String,
    /// RGB color.
    Color,
    /// RGBA color.
    AColor,
    /// 3D vector.
    Vector,
    /// 2D vector.
    Vector2,
    /// 3x3 matrix.
    Matrix,
    /// Affine transform.
    Transform,
    /// Plugin reference.
    Plugin,
    /// Integer list.
    ListInt,
    /// Float list.
    ListFloat,
    /// Vector list.
    ListVector,
    /// Color list.
    ListColor,
    /// String list.
    ListString,
    /// Plugin reference list.
    ListPlugin,
    /// Mesh map channels.
    MapChannels,
    /// Instancer records.
    Instancer,
}

/// Attribute table of one renderer plugin type.
#[derive(Debug)]
pub struct PluginSchema {
    /// Renderer plugin type.
    pub plugin_id: &'static str,
    /// Known attributes and their types.
    pub attrs: &'static [(&'static str, AttrType)],
}

impl PluginSchema {
    /// Type of a known attribute.
    pub fn attr_type(&self, name: &str) -> Option<AttrType> {
        self.attrs.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
    }
}

use AttrType as T;

static SCHEMAS: &[PluginSchema] = &[
    PluginSchema {
        plugin_id: "Node",
        attrs: &[
            ("transform", T::Transform),
            ("geometry", T::Plugin),
            ("material", T::Plugin),
            ("visible", T::Int),
            ("objectID", T::Int),
            ("nsamples", T::Int),
        ],
    },
    PluginSchema {
        plugin_id: "GeomStaticMesh",
        attrs: &[
            ("vertices", T::ListVector),
            ("faces", T::ListInt),
            ("normals", T::ListVector),
            ("faceNormals", T::ListInt),
            ("map_channels", T::MapChannels),
            ("dynamic_geometry", T::Int),
        ],
    },
    PluginSchema {
        plugin_id: "GeomMayaHair",
        attrs: &[
            ("num_hair_vertices", T::ListInt),
            ("hair_vertices", T::ListVector),
            ("widths", T::ListFloat),
        ],
    },
    PluginSchema {
        plugin_id: "Instancer",
        attrs: &[("instances", T::Instancer), ("visible", T::Int)],
    },
    PluginSchema {
        plugin_id: "LightOmni",
        attrs: &[
            ("transform", T::Transform),
            ("color", T::Color),
            ("intensity", T::Float),
            ("enabled", T::Int),
        ],
    },
    PluginSchema {
        plugin_id: "RenderView",
        attrs: &[
            ("transform", T::Transform),
            ("fov", T::Float),
            ("clipping_near", T::Float),
            ("clipping_far", T::Float),
            ("orthographic", T::Int),
        ],
    },
    PluginSchema {
        plugin_id: "SettingsOutput",
        attrs: &[
            ("img_width", T::Int),
            ("img_height", T::Int),
            ("anim_start", T::Int),
            ("anim_end", T::Int),
            ("frame_start", T::Int),
            ("frames", T::ListInt),
            ("img_file", T::String),
        ],
    },
];

/// Schema for a plugin type, if the type is known.
pub fn schema_for(plugin_id: &str) -> Option<&'static PluginSchema> {
    SCHEMAS.iter().find(|s| s.plugin_id == plugin_id)
}

/// Conform a description to its plugin schema.
///
/// Unknown attributes are dropped, type mismatches fail with an encoding error. Plugin types
/// without a schema pass through unchanged.
pub fn conform(desc: &PluginDesc) -> SceneportResult<PluginDesc> {
    let Some(schema) = schema_for(&desc.plugin_id) else {
        return Ok(desc.clone());
    };

    for attr in desc.attrs() {
        if let Some(expected) = schema.attr_type(&attr.name) {
            let got = attr.value.attr_type();
            if got != expected {
                return Err(SceneportError::encoding(format!(
                    "{} '{}': attribute '{}' expects {:?}, got {:?}",
                    desc.plugin_id, desc.name, attr.name, expected, got
                )));
            }
        } else {
            tracing::debug!(
                plugin = %desc.name,
                attr = %attr.name,
                "dropping attribute unknown to {} schema",
                desc.plugin_id
            );
        }
    }

    let mut out = desc.clone();
    out.retain_attrs(|a| schema.attr_type(&a.name).is_some());
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/plugin/schema.rs"]
mod tests;
