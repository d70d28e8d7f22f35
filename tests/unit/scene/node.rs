use super::*;
use crate::plugin::value::AttrValue;

#[test]
fn node_plugin_carries_state_in_order() {
    let mut node = ExportableNode::new(
        IdentityHash::object(ObjectId(7)),
        "OBCube".into(),
        ObjectId(7),
        NodeKind::Object,
    );
    node.geometry = Some(PluginRef::new("MECube"));
    node.visible = false;

    let desc = node.to_plugin();
    assert_eq!(desc.plugin_id, "Node");
    assert_eq!(desc.category, PluginCategory::Object);
    let names: Vec<_> = desc.attrs().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["transform", "geometry", "visible", "objectID"]);
    assert_eq!(
        desc.get("geometry"),
        Some(&AttrValue::Plugin(PluginRef::new("MECube")))
    );
    assert_eq!(desc.get("objectID"), Some(&AttrValue::Int(7)));
}

#[test]
fn nodes_without_geometry_omit_the_attribute() {
    let node = ExportableNode::new(
        IdentityHash::object(ObjectId(u64::MAX)),
        "OBEmpty".into(),
        ObjectId(u64::MAX),
        NodeKind::Object,
    );
    let desc = node.to_plugin();
    assert!(desc.get("geometry").is_none());
    assert_eq!(desc.get("objectID"), Some(&AttrValue::Int(i32::MAX)));
}
