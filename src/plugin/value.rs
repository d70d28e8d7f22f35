use std::fmt;

use crate::foundation::error::{SceneportError, SceneportResult};
use crate::foundation::math::{AColor, Color, Matrix3, Transform, Vector2, Vector3};
use crate::plugin::schema::AttrType;

/// Reference to another plugin instance by name, optionally to one of its named outputs.
///
/// The writer never checks that the target exists; name resolution belongs to the renderer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginRef {
    /// Referenced plugin instance name.
    pub name: String,
    /// Optional output socket.
    pub output: Option<String>,
}

impl PluginRef {
    /// Reference a plugin's default output.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: None,
        }
    }

    /// Reference a named output of a plugin.
    pub fn with_output(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: Some(output.into()),
        }
    }
}

impl fmt::Display for PluginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.output {
            Some(out) => write!(f, "{}::{}", self.name, out),
            None => f.write_str(&self.name),
        }
    }
}

/// Element kinds that have a binary (hex/zip) list encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListElem {
    /// `i32` elements.
    Int,
    /// `f32` elements.
    Float,
    /// Three `f32` per element.
    Vector,
    /// Three `f32` per element.
    Color,
}

impl ListElem {
    /// Encoded size of one element in bytes.
    pub fn byte_size(self) -> usize {
        match self {
            Self::Int | Self::Float => 4,
            Self::Vector | Self::Color => 12,
        }
    }

    /// Type name used in the textual format (`ListInt`, ...).
    pub fn list_ident(self) -> &'static str {
        match self {
            Self::Int => "ListInt",
            Self::Float => "ListFloat",
            Self::Vector => "ListVector",
            Self::Color => "ListColor",
        }
    }

    pub(crate) fn from_list_ident(ident: &str) -> Option<Self> {
        match ident {
            "ListInt" => Some(Self::Int),
            "ListFloat" => Some(Self::Float),
            "ListVector" => Some(Self::Vector),
            "ListColor" => Some(Self::Color),
            _ => None,
        }
    }

    pub(crate) fn attr_type(self) -> AttrType {
        match self {
            Self::Int => AttrType::ListInt,
            Self::Float => AttrType::ListFloat,
            Self::Vector => AttrType::ListVector,
            Self::Color => AttrType::ListColor,
        }
    }
}

/// Bulk list data that arrives already packed as little-endian bytes (e.g. host mesh buffers).
#[derive(Clone, Debug, PartialEq)]
pub struct PackedList {
    /// Element kind.
    pub elem: ListElem,
    /// Declared element count.
    pub count: usize,
    /// Little-endian element bytes.
    pub bytes: Vec<u8>,
}

impl PackedList {
    /// Verify that the byte length matches the declared element count.
    pub fn check(&self) -> SceneportResult<()> {
        let expected = self.count.checked_mul(self.elem.byte_size());
        if expected != Some(self.bytes.len()) {
            return Err(SceneportError::encoding(format!(
                "{} declares {} elements but carries {} bytes",
                self.elem.list_ident(),
                self.count,
                self.bytes.len()
            )));
        }
        Ok(())
    }

    /// Decode into a typed list.
    pub fn unpack(&self) -> SceneportResult<AttrList> {
        self.check()?;
        AttrList::from_le_bytes(self.elem, &self.bytes)
    }
}

/// Homogeneous attribute list.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrList {
    /// Integer list.
    Int(Vec<i32>),
    /// Float list.
    Float(Vec<f32>),
    /// Vector list.
    Vector(Vec<Vector3>),
    /// Color list.
    Color(Vec<Color>),
    /// String list (always written inline).
    String(Vec<String>),
    /// Plugin reference list (always written inline).
    Plugin(Vec<PluginRef>),
    /// Pre-packed bulk data.
    Packed(PackedList),
}

impl AttrList {
    /// Number of elements (declared count for packed lists).
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Vector(v) => v.len(),
            Self::Color(v) => v.len(),
            Self::String(v) => v.len(),
            Self::Plugin(v) => v.len(),
            Self::Packed(p) => p.count,
        }
    }

    /// Return `true` when the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element kind for lists with a binary encoding.
    pub fn elem(&self) -> Option<ListElem> {
        match self {
            Self::Int(_) => Some(ListElem::Int),
            Self::Float(_) => Some(ListElem::Float),
            Self::Vector(_) => Some(ListElem::Vector),
            Self::Color(_) => Some(ListElem::Color),
            Self::Packed(p) => Some(p.elem),
            Self::String(_) | Self::Plugin(_) => None,
        }
    }

    /// Little-endian element bytes for binary-encodable lists.
    pub fn to_le_bytes(&self) -> SceneportResult<Option<Vec<u8>>> {
        fn floats<'a>(out: &mut Vec<u8>, it: impl Iterator<Item = &'a f32>) {
            for v in it {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }

        let mut out = Vec::with_capacity(self.len() * 12);
        match self {
            Self::Int(v) => {
                for i in v {
                    out.extend_from_slice(&i.to_le_bytes());
                }
            }
            Self::Float(v) => floats(&mut out, v.iter()),
            Self::Vector(v) => {
                for p in v {
                    floats(&mut out, [p.x, p.y, p.z].iter());
                }
            }
            Self::Color(v) => {
                for c in v {
                    floats(&mut out, [c.r, c.g, c.b].iter());
                }
            }
            Self::Packed(p) => {
                p.check()?;
                return Ok(Some(p.bytes.clone()));
            }
            Self::String(_) | Self::Plugin(_) => return Ok(None),
        }
        Ok(Some(out))
    }

    /// Decode little-endian element bytes into a typed list.
    pub fn from_le_bytes(elem: ListElem, bytes: &[u8]) -> SceneportResult<Self> {
        if !bytes.len().is_multiple_of(elem.byte_size()) {
            return Err(SceneportError::encoding(format!(
                "{} payload of {} bytes is not a whole number of elements",
                elem.list_ident(),
                bytes.len()
            )));
        }
        let f = |c: &[u8]| f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
        Ok(match elem {
            ListElem::Int => Self::Int(
                bytes
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            ListElem::Float => Self::Float(bytes.chunks_exact(4).map(f).collect()),
            ListElem::Vector => Self::Vector(
                bytes
                    .chunks_exact(12)
                    .map(|c| Vector3::new(f(&c[0..4]), f(&c[4..8]), f(&c[8..12])))
                    .collect(),
            ),
            ListElem::Color => Self::Color(
                bytes
                    .chunks_exact(12)
                    .map(|c| Color {
                        r: f(&c[0..4]),
                        g: f(&c[4..8]),
                        b: f(&c[8..12]),
                    })
                    .collect(),
            ),
        })
    }
}

/// One UV/map channel of a mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct MapChannel {
    /// Channel index.
    pub index: i32,
    /// Channel vertices (UVW).
    pub vertices: Vec<Vector3>,
    /// Triangle indices into `vertices`.
    pub faces: Vec<i32>,
}

/// Set of map channels attached to a mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapChannels {
    /// Channels in index order.
    pub channels: Vec<MapChannel>,
}

/// One instance record of an instancer.
#[derive(Clone, Debug, PartialEq)]
pub struct InstancerItem {
    /// Stable instance index.
    pub index: i32,
    /// Instance transform.
    pub transform: Transform,
    /// Velocity transform (motion blur).
    pub velocity: Transform,
    /// Prototype node.
    pub node: PluginRef,
}

/// Instancer record set for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Instancer {
    /// Frame the records belong to.
    pub frame: i32,
    /// Instances.
    pub items: Vec<InstancerItem>,
}

/// Tagged attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    /// Integer (also used for booleans).
    Int(i32),
    /// Float.
    Float(f32),
    /// String.
    String(String),
    /// RGB color.
    Color(Color),
    /// RGBA color.
    AColor(AColor),
    /// 3D vector.
    Vector(Vector3),
    /// 2D vector.
    Vector2(Vector2),
    /// 3x3 matrix.
    Matrix(Matrix3),
    /// Affine transform.
    Transform(Transform),
    /// Homogeneous list.
    List(AttrList),
    /// Plugin reference.
    Plugin(PluginRef),
    /// Mesh map channels.
    MapChannels(MapChannels),
    /// Instancer records.
    Instancer(Instancer),
}

impl AttrValue {
    /// Schema type of this value.
    pub fn attr_type(&self) -> AttrType {
        match self {
            Self::Int(_) => AttrType::Int,
            Self::Float(_) => AttrType::Float,
            Self::String(_) => AttrType::String,
            Self::Color(_) => AttrType::Color,
            Self::AColor(_) => AttrType::AColor,
            Self::Vector(_) => AttrType::Vector,
            Self::Vector2(_) => AttrType::Vector2,
            Self::Matrix(_) => AttrType::Matrix,
            Self::Transform(_) => AttrType::Transform,
            Self::Plugin(_) => AttrType::Plugin,
            Self::MapChannels(_) => AttrType::MapChannels,
            Self::Instancer(_) => AttrType::Instancer,
            Self::List(l) => match l {
                AttrList::String(_) => AttrType::ListString,
                AttrList::Plugin(_) => AttrType::ListPlugin,
                other => other.elem().map_or(AttrType::ListInt, ListElem::attr_type),
            },
        }
    }

    /// Replace packed lists by their typed form, so values compare by logical content.
    pub fn unpacked(self) -> SceneportResult<Self> {
        match self {
            Self::List(AttrList::Packed(p)) => Ok(Self::List(p.unpack()?)),
            other => Ok(other),
        }
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Int(i32::from(v))
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Color> for AttrValue {
    fn from(v: Color) -> Self {
        Self::Color(v)
    }
}

impl From<Vector3> for AttrValue {
    fn from(v: Vector3) -> Self {
        Self::Vector(v)
    }
}

impl From<Transform> for AttrValue {
    fn from(v: Transform) -> Self {
        Self::Transform(v)
    }
}

impl From<PluginRef> for AttrValue {
    fn from(v: PluginRef) -> Self {
        Self::Plugin(v)
    }
}

impl From<AttrList> for AttrValue {
    fn from(v: AttrList) -> Self {
        Self::List(v)
    }
}

impl From<Vec<i32>> for AttrValue {
    fn from(v: Vec<i32>) -> Self {
        Self::List(AttrList::Int(v))
    }
}

impl From<Vec<f32>> for AttrValue {
    fn from(v: Vec<f32>) -> Self {
        Self::List(AttrList::Float(v))
    }
}

impl From<Vec<Vector3>> for AttrValue {
    fn from(v: Vec<Vector3>) -> Self {
        Self::List(AttrList::Vector(v))
    }
}

impl From<MapChannels> for AttrValue {
    fn from(v: MapChannels) -> Self {
        Self::MapChannels(v)
    }
}

impl From<Instancer> for AttrValue {
    fn from(v: Instancer) -> Self {
        Self::Instancer(v)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/plugin/value.rs"]
mod tests;
