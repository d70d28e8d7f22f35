use crate::plugin::value::{AttrValue, PluginRef};

/// Partition a plugin belongs to.
///
/// File exports in split mode write one file per category.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    /// Geometry sources (meshes, hair, instancers).
    Geometry,
    /// Scene nodes placing geometry.
    Object,
    /// Lights.
    Light,
    /// Camera and view.
    Camera,
    /// Materials and BRDFs.
    Material,
    /// Textures.
    Texture,
    /// Environment and volumes.
    Environment,
    /// Renderer settings.
    Settings,
    /// Render effects.
    Effect,
}

impl PluginCategory {
    /// All categories in file-partition order.
    pub const ALL: [Self; 9] = [
        Self::Settings,
        Self::Camera,
        Self::Environment,
        Self::Light,
        Self::Texture,
        Self::Material,
        Self::Geometry,
        Self::Object,
        Self::Effect,
    ];

    /// Suffix of the split-mode partition file.
    pub fn partition_suffix(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Object => "nodes",
            Self::Light => "lights",
            Self::Camera => "camera",
            Self::Material => "materials",
            Self::Texture => "textures",
            Self::Environment => "environment",
            Self::Settings => "settings",
            Self::Effect => "effects",
        }
    }
}

/// One named attribute of a plugin instance.
#[derive(Clone, Debug, PartialEq)]
pub struct PluginAttr {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: AttrValue,
}

/// Named, typed attribute set describing one renderer plugin instance.
///
/// Attributes keep insertion order. Absent values are never stored, so they are omitted from
/// every output rather than written as placeholders.
#[derive(Clone, Debug, PartialEq)]
pub struct PluginDesc {
    /// Instance name (unique within one export).
    pub name: String,
    /// Renderer plugin type (`Node`, `GeomStaticMesh`, ...).
    pub plugin_id: String,
    /// Output partition.
    pub category: PluginCategory,
    attrs: Vec<PluginAttr>,
}

impl PluginDesc {
    /// Create an empty description.
    pub fn new(
        name: impl Into<String>,
        plugin_id: impl Into<String>,
        category: PluginCategory,
    ) -> Self {
        Self {
            name: name.into(),
            plugin_id: plugin_id.into(),
            category,
            attrs: Vec::new(),
        }
    }

    /// Builder form of [`PluginDesc::set`].
    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder form of [`PluginDesc::set_opt`].
    pub fn with_opt<V: Into<AttrValue>>(mut self, name: &str, value: Option<V>) -> Self {
        self.set_opt(name, value);
        self
    }

    /// Set an attribute, replacing an existing value of the same name in place.
    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(a) => a.value = value,
            None => self.attrs.push(PluginAttr {
                name: name.to_owned(),
                value,
            }),
        }
    }

    /// Set an attribute when present; `None` removes any previous value.
    pub fn set_opt<V: Into<AttrValue>>(&mut self, name: &str, value: Option<V>) {
        match value {
            Some(v) => self.set(name, v),
            None => {
                self.remove(name);
            }
        }
    }

    /// Remove an attribute, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let idx = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(idx).value)
    }

    /// Look up an attribute value.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// Attributes in insertion order.
    pub fn attrs(&self) -> &[PluginAttr] {
        &self.attrs
    }

    pub(crate) fn retain_attrs(&mut self, f: impl FnMut(&PluginAttr) -> bool) {
        self.attrs.retain(f);
    }

    /// Reference to this plugin's default output.
    pub fn plugin_ref(&self) -> PluginRef {
        PluginRef::new(self.name.clone())
    }
}

/// Make a host name usable as a plugin instance name.
///
/// Keeps ASCII alphanumerics, `_`, `@` and `|`; everything else becomes `_`.
pub fn sanitize_plugin_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '|') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/plugin/desc.rs"]
mod tests;
