use smallvec::SmallVec;

use crate::foundation::error::{SceneportError, SceneportResult};
use crate::foundation::math::{MAT4_IDENTITY, Mat4, mat4_translation};

/// Globally unique, session-stable host object identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

/// Host object type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Polygon mesh.
    Mesh,
    /// Curve.
    Curve,
    /// NURBS surface.
    Surface,
    /// Text.
    Font,
    /// Metaball.
    MetaBall,
    /// Empty (transform only).
    Empty,
    /// Camera.
    Camera,
    /// Lamp.
    Lamp,
    /// Armature.
    Armature,
    /// Lattice.
    Lattice,
    /// Speaker.
    Speaker,
}

impl ObjectKind {
    /// Return `true` for types that carry renderable geometry.
    pub fn is_geometry(self) -> bool {
        matches!(
            self,
            Self::Mesh | Self::Curve | Self::Surface | Self::Font | Self::MetaBall
        )
    }
}

/// Location key of an animated object.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocationKey {
    /// Key frame.
    pub frame: i32,
    /// World-space location at `frame`.
    pub location: [f32; 3],
}

/// Role of an object in a smoke simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmokeRole {
    /// Simulation domain; its geometry is produced by the effects subsystem.
    Domain,
    /// Emitting flow object.
    Flow,
    /// Collider.
    Collision,
}

/// Object modifier.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Modifier {
    /// Drives one of the object's particle systems.
    ParticleSystem {
        /// Index into [`HostObject::particle_systems`].
        system: usize,
        /// Enabled for final renders.
        #[serde(default = "yes")]
        show_render: bool,
    },
    /// Smoke simulation participation.
    Smoke {
        /// Role in the simulation.
        role: SmokeRole,
    },
    /// Any other modifier.
    Other {
        /// Modifier name.
        name: String,
    },
}

fn yes() -> bool {
    true
}

fn all_layers() -> u32 {
    1
}

/// Particle system type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    /// Point particles (optionally instancing an object).
    #[default]
    Emitter,
    /// Hair strands.
    Hair,
}

/// One emitted particle.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Particle {
    /// World-space location.
    pub location: [f32; 3],
    /// World-space velocity.
    #[serde(default)]
    pub velocity: [f32; 3],
}

/// One hair strand.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HairStrand {
    /// Control points in object space.
    pub points: Vec<[f32; 3]>,
    /// Strand width.
    #[serde(default = "default_hair_width")]
    pub width: f32,
}

fn default_hair_width() -> f32 {
    0.01
}

/// Particle system attached to an object.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParticleSystem {
    /// System name.
    pub name: String,
    /// Render the emitting object as well.
    #[serde(default)]
    pub render_emitter: bool,
    /// System type.
    #[serde(default)]
    pub kind: ParticleKind,
    /// Emitted particles at the evaluated frame.
    #[serde(default)]
    pub particles: Vec<Particle>,
    /// Object instanced at every particle.
    #[serde(default)]
    pub instance_object: Option<ObjectId>,
    /// Hair strands (hair systems).
    #[serde(default)]
    pub strands: Vec<HairStrand>,
}

/// Mesh data block.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshData {
    /// Data block name (shared meshes share a name).
    pub name: String,
    /// Vertex positions.
    pub vertices: Vec<[f32; 3]>,
    /// Polygons as vertex index loops.
    pub polygons: Vec<Vec<u32>>,
    /// Optional per-vertex UVs (empty, or one per vertex).
    #[serde(default)]
    pub uvs: Vec<[f32; 2]>,
}

impl MeshData {
    /// Fan-triangulate the polygons into a flat triangle index list.
    pub fn triangles(&self) -> SceneportResult<Vec<i32>> {
        let n = self.vertices.len();
        let mut out = Vec::with_capacity(self.polygons.len() * 3);
        for (pi, poly) in self.polygons.iter().enumerate() {
            if poly.len() < 3 {
                return Err(SceneportError::validation(format!(
                    "mesh '{}': polygon {pi} has {} vertices",
                    self.name,
                    poly.len()
                )));
            }
            if let Some(bad) = poly.iter().find(|&&v| v as usize >= n) {
                return Err(SceneportError::validation(format!(
                    "mesh '{}': polygon {pi} references vertex {bad} of {n}",
                    self.name
                )));
            }
            for k in 1..poly.len() - 1 {
                out.extend([poly[0] as i32, poly[k] as i32, poly[k + 1] as i32]);
            }
        }
        Ok(out)
    }
}

/// Duplication (instancing) set up on an object.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DupliDef {
    /// Instances every object of a group at the duplicator.
    Group {
        /// Group members.
        objects: Vec<ObjectId>,
    },
    /// Linear array of one object.
    Array {
        /// Instanced object.
        object: ObjectId,
        /// Number of copies.
        count: u32,
        /// Offset between copies.
        offset: [f32; 3],
    },
}

/// Lamp data.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LampData {
    /// Light color.
    pub color: [f32; 3],
    /// Intensity multiplier.
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

fn default_intensity() -> f32 {
    1.0
}

/// Camera data.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraData {
    /// Horizontal field of view in radians.
    pub fov: f32,
    /// Near clip distance.
    #[serde(default = "default_clip_start")]
    pub clip_start: f32,
    /// Far clip distance.
    #[serde(default = "default_clip_end")]
    pub clip_end: f32,
    /// Orthographic projection.
    #[serde(default)]
    pub orthographic: bool,
}

fn default_clip_start() -> f32 {
    0.1
}

fn default_clip_end() -> f32 {
    100.0
}

/// Modification stamp of an object's geometry at one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryStamp {
    /// Data block modification counter.
    pub mtime: u64,
    /// Evaluation frame for geometry that changes every frame.
    pub frame: Option<i32>,
}

/// Read-only view of one host scene object.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HostObject {
    /// Unique identifier.
    pub id: ObjectId,
    /// Object name.
    pub name: String,
    /// Object type.
    pub kind: ObjectKind,
    /// Disabled for rendering.
    #[serde(default)]
    pub hide_render: bool,
    /// Layer membership bit mask.
    #[serde(default = "all_layers")]
    pub layers: u32,
    /// World matrix (row-major) when not animated.
    #[serde(default = "identity")]
    pub matrix_world: Mat4,
    /// Location animation.
    #[serde(default)]
    pub location_keys: Vec<LocationKey>,
    /// Modifier stack.
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    /// Particle systems.
    #[serde(default)]
    pub particle_systems: Vec<ParticleSystem>,
    /// Mesh data for geometry objects.
    #[serde(default)]
    pub mesh: Option<MeshData>,
    /// Geometry modification counter.
    #[serde(default)]
    pub data_mtime: u64,
    /// Geometry is deformed per frame (armature, simulation).
    #[serde(default)]
    pub deforming: bool,
    /// Material name.
    #[serde(default)]
    pub material: Option<String>,
    /// Duplication set-up.
    #[serde(default)]
    pub dupli: Option<DupliDef>,
    /// Lamp data for lamp objects.
    #[serde(default)]
    pub lamp: Option<LampData>,
    /// Camera data for camera objects.
    #[serde(default)]
    pub camera: Option<CameraData>,
}

fn identity() -> Mat4 {
    MAT4_IDENTITY
}

impl HostObject {
    /// Create an object with default flags at the origin.
    pub fn new(id: u64, name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id: ObjectId(id),
            name: name.into(),
            kind,
            hide_render: false,
            layers: all_layers(),
            matrix_world: MAT4_IDENTITY,
            location_keys: Vec::new(),
            modifiers: Vec::new(),
            particle_systems: Vec::new(),
            mesh: None,
            data_mtime: 0,
            deforming: false,
            material: None,
            dupli: None,
            lamp: None,
            camera: None,
        }
    }

    /// World matrix at `frame`; location keys override the translation with linear
    /// interpolation, clamped outside the keyed range.
    pub fn matrix_world_at(&self, frame: i32) -> Mat4 {
        let Some(loc) = self.location_at(frame) else {
            return self.matrix_world;
        };
        let mut m = self.matrix_world;
        for (r, v) in loc.into_iter().enumerate() {
            m[r][3] = v;
        }
        m
    }

    fn location_at(&self, frame: i32) -> Option<[f32; 3]> {
        let keys = &self.location_keys;
        let first = keys.first()?;
        if frame <= first.frame {
            return Some(first.location);
        }
        for w in keys.windows(2) {
            let (a, b) = (w[0], w[1]);
            if frame <= b.frame {
                let span = (b.frame - a.frame).max(1) as f32;
                let t = (frame - a.frame) as f32 / span;
                return Some(std::array::from_fn(|i| {
                    a.location[i] + (b.location[i] - a.location[i]) * t
                }));
            }
        }
        keys.last().map(|k| k.location)
    }

    /// Geometry modification stamp at `frame`.
    pub fn geometry_stamp(&self, frame: i32) -> GeometryStamp {
        GeometryStamp {
            mtime: self.data_mtime,
            frame: self.deforming.then_some(frame),
        }
    }

    /// Return `true` when the object is a smoke simulation domain.
    pub fn is_simulation_domain(&self) -> bool {
        self.modifiers.iter().any(|m| {
            matches!(
                m,
                Modifier::Smoke {
                    role: SmokeRole::Domain
                }
            )
        })
    }

    /// Particle systems enabled for rendering through their modifier.
    pub fn render_particle_systems(&self) -> impl Iterator<Item = (usize, &ParticleSystem)> {
        self.modifiers.iter().filter_map(|m| match m {
            Modifier::ParticleSystem {
                system,
                show_render: true,
            } => self.particle_systems.get(*system).map(|p| (*system, p)),
            _ => None,
        })
    }

    /// Return `true` when the object produces instances (duplication or instancing particles).
    pub fn is_duplicator(&self) -> bool {
        self.dupli.is_some()
            || self.render_particle_systems().any(|(_, p)| {
                p.kind == ParticleKind::Emitter && p.instance_object.is_some()
            })
    }

    /// Return `false` when particle systems are attached and none renders its emitter.
    pub fn renders_emitter(&self) -> bool {
        self.particle_systems.is_empty() || self.particle_systems.iter().any(|p| p.render_emitter)
    }
}

/// Instancing path of one resolved instance (outermost first).
pub type PersistentId = SmallVec<[i32; 4]>;

/// One resolved instance of a duplicator at one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DupliObject {
    /// Instanced source object.
    pub source: ObjectId,
    /// Instancing path, unique within the duplicator.
    pub persistent_id: PersistentId,
    /// Instance world matrix.
    pub matrix: Mat4,
    /// Index of the generating particle system, for particle instancing.
    pub particle_system: Option<usize>,
    /// Index of the generating particle, for particle instancing.
    pub particle_index: Option<usize>,
    /// Instance velocity (particle instancing).
    pub velocity: [f32; 3],
}

impl DupliObject {
    /// Instance placed at `matrix` with no velocity.
    pub fn new(source: ObjectId, persistent_id: &[i32], matrix: Mat4) -> Self {
        Self {
            source,
            persistent_id: SmallVec::from_slice(persistent_id),
            matrix,
            particle_system: None,
            particle_index: None,
            velocity: [0.0; 3],
        }
    }

    /// Instance at a particle.
    pub fn particle(source: ObjectId, system: usize, index: usize, p: &Particle) -> Self {
        Self {
            source,
            persistent_id: SmallVec::from_slice(&[system as i32, index as i32]),
            matrix: mat4_translation(p.location),
            particle_system: Some(system),
            particle_index: Some(index),
            velocity: p.velocity,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/model.rs"]
mod tests;
