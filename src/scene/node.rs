use crate::foundation::math::Transform;
use crate::host::model::ObjectId;
use crate::plugin::desc::{PluginCategory, PluginDesc};
use crate::plugin::value::PluginRef;
use crate::scene::identity::IdentityHash;

/// What an exportable node stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A top-level scene object.
    Object,
    /// One resolved duplication or particle instance.
    Instance,
    /// Hair strands of one particle system.
    Hair,
    /// Wrapper around a duplicator's instancer geometry.
    Instancer,
    /// Hidden prototype referenced by instancer records.
    Prototype,
}

/// The exporter's own record of one renderable entity.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportableNode {
    /// Cross-frame identity.
    pub identity: IdentityHash,
    /// Plugin instance name.
    pub name: String,
    /// Host object the node was created from.
    pub source: ObjectId,
    /// Node kind.
    pub kind: NodeKind,
    /// World transform at `frame`.
    pub transform: Transform,
    /// Geometry plugin placed by the node.
    pub geometry: Option<PluginRef>,
    /// Render visibility.
    pub visible: bool,
    /// Walk pass that last touched the node.
    pub pass: u64,
}

impl ExportableNode {
    /// Create a visible node with identity transform.
    pub fn new(identity: IdentityHash, name: String, source: ObjectId, kind: NodeKind) -> Self {
        Self {
            identity,
            name,
            source,
            kind,
            transform: Transform::IDENTITY,
            geometry: None,
            visible: true,
            pass: 0,
        }
    }

    /// `Node` plugin description of the current state.
    pub fn to_plugin(&self) -> PluginDesc {
        PluginDesc::new(self.name.clone(), "Node", PluginCategory::Object)
            .with("transform", self.transform)
            .with_opt("geometry", self.geometry.clone())
            .with("visible", self.visible)
            .with("objectID", (self.source.0 & 0x7fff_ffff) as i32)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/node.rs"]
mod tests;
