use super::*;
use crate::host::model::ObjectId;
use crate::scene::node::NodeKind;

fn make(id: u64) -> impl FnOnce() -> ExportableNode {
    move || {
        ExportableNode::new(
            IdentityHash::object(ObjectId(id)),
            format!("OB{id}"),
            ObjectId(id),
            NodeKind::Object,
        )
    }
}

#[test]
fn second_lookup_reuses_the_node() {
    let mut cache = NodeCache::new();
    let id = IdentityHash::object(ObjectId(1));
    let (node, is_new) = cache.lookup_or_create(id, make(1));
    assert!(is_new);
    node.visible = false;
    let (node, is_new) = cache.lookup_or_create(id, || panic!("must not be rebuilt"));
    assert!(!is_new);
    assert!(!node.visible);
    assert_eq!(cache.len(), 1);
}

#[test]
fn clear_forgets_nodes_and_geometry() {
    let mut cache = NodeCache::new();
    let stamp = GeometryStamp {
        mtime: 1,
        frame: None,
    };
    cache.lookup_or_create(IdentityHash::object(ObjectId(1)), make(1));
    cache.mark_geometry("MEa", stamp);
    assert!(!cache.geometry_changed("MEa", stamp));
    cache.clear();
    assert!(cache.is_empty());
    assert!(cache.geometry_changed("MEa", stamp));
    let (_, is_new) = cache.lookup_or_create(IdentityHash::object(ObjectId(1)), make(1));
    assert!(is_new);
}

#[test]
fn geometry_stamps_detect_changes() {
    let mut cache = NodeCache::new();
    let s1 = GeometryStamp {
        mtime: 1,
        frame: None,
    };
    assert!(cache.geometry_changed("MEa", s1));
    cache.mark_geometry("MEa", s1);
    assert!(!cache.geometry_changed("MEa", s1));
    assert!(cache.geometry_changed("MEa", GeometryStamp { mtime: 2, ..s1 }));
    assert!(cache.geometry_changed("MEb", s1));
}

#[test]
fn retire_stale_removes_nodes_the_pass_missed() {
    let mut cache = NodeCache::new();
    assert_eq!(cache.begin_pass(), 1);
    for id in [3, 1, 2] {
        cache.lookup_or_create(IdentityHash::object(ObjectId(id)), make(id));
    }
    assert!(cache.retire_stale().is_empty());

    cache.begin_pass();
    cache.lookup_or_create(IdentityHash::object(ObjectId(2)), make(2));
    let stale: Vec<_> = cache.retire_stale().into_iter().map(|n| n.name).collect();
    assert_eq!(stale, vec!["OB1", "OB3"]);
    assert_eq!(cache.len(), 1);
    assert!(cache.get(&IdentityHash::object(ObjectId(2))).is_some());
}
