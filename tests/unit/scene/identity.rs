use super::*;
use std::collections::HashSet;

#[test]
fn identities_are_deterministic() {
    assert_eq!(IdentityHash::object(ObjectId(7)), IdentityHash::object(ObjectId(7)));
    assert_eq!(
        IdentityHash::instance(ObjectId(1), ObjectId(2), &[0, 3]),
        IdentityHash::instance(ObjectId(1), ObjectId(2), &[0, 3])
    );
    assert_eq!(IdentityHash::object(ObjectId(7)).to_string().len(), 32);
}

#[test]
fn domains_and_paths_do_not_collide() {
    let mut seen = HashSet::new();
    for id in 0..50u64 {
        assert!(seen.insert(IdentityHash::object(ObjectId(id))));
        assert!(seen.insert(IdentityHash::instancer(ObjectId(id))));
        assert!(seen.insert(IdentityHash::hair(ObjectId(id), 0)));
        for p in 0..4 {
            assert!(seen.insert(IdentityHash::instance(ObjectId(id), ObjectId(99), &[p])));
            assert!(seen.insert(IdentityHash::instance(ObjectId(id), ObjectId(99), &[0, p])));
        }
    }
}

#[test]
fn instancing_parent_is_part_of_identity() {
    assert_ne!(
        IdentityHash::instance(ObjectId(1), ObjectId(3), &[0]),
        IdentityHash::instance(ObjectId(2), ObjectId(3), &[0])
    );
}
