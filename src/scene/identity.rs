use xxhash_rust::xxh3::Xxh3;

use crate::host::model::ObjectId;

const XXH3_SEED: u64 = 0x8b5ad4a0c7d8e9f1;

// Domain tags keep object, instance, hair and instancer identities disjoint.
const TAG_OBJECT: u8 = 1;
const TAG_INSTANCE: u8 = 2;
const TAG_HAIR: u8 = 3;
const TAG_INSTANCER: u8 = 4;

/// Stable identity of one exportable node across frames.
///
/// Built only from host object identifiers plus the full instancing path, never from object
/// content, so editing an object cannot move it onto another object's identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityHash {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

impl IdentityHash {
    /// Identity of a top-level object.
    pub fn object(id: ObjectId) -> Self {
        let mut h = StableHasher::new(TAG_OBJECT);
        h.write_u64(id.0);
        h.finish()
    }

    /// Identity of one resolved instance of `source` produced by `parent`.
    pub fn instance(parent: ObjectId, source: ObjectId, path: &[i32]) -> Self {
        let mut h = StableHasher::new(TAG_INSTANCE);
        h.write_u64(parent.0);
        h.write_u64(source.0);
        h.write_u32(path.len() as u32);
        for p in path {
            h.write_i32(*p);
        }
        h.finish()
    }

    /// Identity of the hair node of one particle system.
    pub fn hair(owner: ObjectId, system: usize) -> Self {
        let mut h = StableHasher::new(TAG_HAIR);
        h.write_u64(owner.0);
        h.write_u64(system as u64);
        h.finish()
    }

    /// Identity of a duplicator's instancer node.
    pub fn instancer(owner: ObjectId) -> Self {
        let mut h = StableHasher::new(TAG_INSTANCER);
        h.write_u64(owner.0);
        h.finish()
    }
}

impl std::fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new(tag: u8) -> Self {
        let mut h = Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        };
        h.write_bytes(&[tag]);
        h
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn finish(self) -> IdentityHash {
        let v = self.inner.digest128();
        IdentityHash {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/identity.rs"]
mod tests;
