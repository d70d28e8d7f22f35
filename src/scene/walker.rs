use std::collections::{BTreeMap, HashSet};

use crate::export::PluginExporter;
use crate::foundation::error::{SceneportError, SceneportResult};
use crate::foundation::math::{Color, Transform, Vector3};
use crate::host::binding::{DupliList, EngineHost, ReportLevel, SceneHandle};
use crate::host::context::HostGuard;
use crate::host::model::{
    DupliObject, HostObject, MeshData, ObjectId, ObjectKind, ParticleKind, ParticleSystem,
};
use crate::plugin::desc::{PluginCategory, PluginDesc, sanitize_plugin_name};
use crate::plugin::value::{
    AttrList, Instancer, InstancerItem, MapChannel, MapChannels, PluginRef,
};
use crate::scene::cache::NodeCache;
use crate::scene::identity::IdentityHash;
use crate::scene::node::{ExportableNode, NodeKind};
use crate::session::settings::RenderSettings;

/// Objects between two coarse progress reports.
pub const PROGRESS_EVERY: usize = 1000;

/// Instancer record indices of particle system `s` start at `(s + 1) * INSTANCER_SYSTEM_STRIDE`;
/// plain duplication instances use their list position below the first stride.
pub const INSTANCER_SYSTEM_STRIDE: usize = 1 << 24;

/// Outcome of one walk pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkReport {
    /// `Node` plugins written.
    pub exported_nodes: usize,
    /// Nodes left out because they were unchanged since their last export.
    pub reused_nodes: usize,
    /// Nodes from earlier passes hidden because nothing produced them in this one.
    pub retired_nodes: usize,
    /// Geometry plugins written.
    pub exported_geometry: usize,
    /// Geometry left out because it was unchanged since its last export.
    pub skipped_geometry: usize,
    /// Objects filtered out by visibility rules.
    pub skipped_objects: usize,
    /// Objects that failed and were skipped.
    pub failed: usize,
    /// The walk stopped early on user interruption.
    pub interrupted: bool,
}

/// Why an object takes no part in the export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Disabled for rendering.
    RenderHidden,
    /// Not on any active layer.
    LayerExcluded,
    /// Simulation domain; its geometry comes from the effects subsystem.
    SimulationDomain,
}

/// Apply the render-eligibility filters to a top-level object.
pub fn classify_object(
    object: &HostObject,
    settings: &RenderSettings,
    active_layers: u32,
) -> Option<SkipReason> {
    if object.hide_render {
        return Some(SkipReason::RenderHidden);
    }
    if settings.use_active_layers && object.layers & active_layers == 0 {
        return Some(SkipReason::LayerExcluded);
    }
    if object.is_simulation_domain() {
        return Some(SkipReason::SimulationDomain);
    }
    None
}

/// Walks the host scene for one frame and hands plugins to an exporter.
///
/// Object-local failures (bad host data, unencodable attributes) are logged, reported to the host
/// as warnings and skipped. Sink failures abort the walk.
pub struct SceneWalker<'a> {
    scene: &'a dyn SceneHandle,
    engine: &'a dyn EngineHost,
    settings: &'a RenderSettings,
    cache: &'a mut NodeCache,
    exporter: &'a mut dyn PluginExporter,
    report_progress: bool,
    frame: i32,
    written_geometry: HashSet<String>,
    report: WalkReport,
}

impl<'a> SceneWalker<'a> {
    /// Create a walker. Progress reporting is on.
    pub fn new(
        scene: &'a dyn SceneHandle,
        engine: &'a dyn EngineHost,
        settings: &'a RenderSettings,
        cache: &'a mut NodeCache,
        exporter: &'a mut dyn PluginExporter,
    ) -> Self {
        Self {
            scene,
            engine,
            settings,
            cache,
            exporter,
            report_progress: true,
            frame: 0,
            written_geometry: HashSet::new(),
            report: WalkReport::default(),
        }
    }

    /// Enable or disable host progress reports (animation runs report per frame instead).
    pub fn report_progress(mut self, on: bool) -> Self {
        self.report_progress = on;
        self
    }

    /// Export every eligible object at `frame`.
    #[tracing::instrument(skip_all, fields(frame = frame))]
    pub fn run(mut self, _host: &HostGuard<'_>, frame: i32) -> SceneportResult<WalkReport> {
        self.frame = frame;
        self.cache.begin_pass();
        let scene = self.scene;
        let objects = scene.objects();
        let active_layers = scene.active_layers();
        self.progress(0.0);

        for (i, object) in objects.iter().enumerate() {
            if self.check_break() {
                break;
            }
            if i > 0 && i % PROGRESS_EVERY == 0 {
                self.progress(i as f32 / objects.len() as f32);
            }
            if let Some(reason) = classify_object(object, self.settings, active_layers) {
                tracing::debug!(object = %object.name, ?reason, "object skipped");
                self.report.skipped_objects += 1;
                continue;
            }
            match self.export_object(object) {
                Ok(()) => {}
                Err(e) if e.is_object_local() => self.object_failed(object, &e),
                Err(e) => return Err(e),
            }
            if self.report.interrupted {
                break;
            }
        }

        if !self.report.interrupted {
            self.retire_stale_nodes()?;
            self.progress(1.0);
        }
        self.exporter.flush()?;
        tracing::debug!(report = ?self.report, "walk finished");
        Ok(self.report)
    }

    // A node that vanished (hidden, off-layer, dead particle) stays registered with the renderer
    // and in keyed files, so it is re-emitted invisible before being dropped.
    fn retire_stale_nodes(&mut self) -> SceneportResult<()> {
        for mut node in self.cache.retire_stale() {
            if !node.visible {
                continue;
            }
            node.visible = false;
            tracing::debug!(node = %node.name, "node retired");
            self.exporter.export_plugin(&node.to_plugin())?;
            self.report.retired_nodes += 1;
        }
        Ok(())
    }

    fn progress(&self, fraction: f32) {
        if self.report_progress {
            self.engine.update_progress(fraction);
        }
    }

    fn check_break(&mut self) -> bool {
        if !self.report.interrupted && self.engine.test_break() {
            self.report.interrupted = true;
            tracing::warn!("export interrupted");
            self.engine.report(ReportLevel::Warning, "Export interrupted!");
        }
        self.report.interrupted
    }

    fn object_failed(&mut self, object: &HostObject, e: &SceneportError) {
        self.report.failed += 1;
        tracing::warn!(object = %object.name, error = %e, "object export failed");
        self.engine.report(
            ReportLevel::Warning,
            &format!("Object '{}' skipped: {e}", object.name),
        );
    }

    fn export_object(&mut self, object: &HostObject) -> SceneportResult<()> {
        match object.kind {
            ObjectKind::Lamp => {
                if self.settings.export_lights {
                    self.export_light(object)?;
                }
                return Ok(());
            }
            ObjectKind::Empty => {}
            kind if !kind.is_geometry() => return Ok(()),
            _ => {}
        }

        if self.settings.export_hair {
            self.export_hair(object)?;
        }
        if object.is_duplicator() && self.settings.export_nodes {
            let duplis = self.scene.dupli_list(object, self.frame)?;
            if self.settings.use_instancer {
                self.export_instancer(object, &duplis)?;
            } else {
                self.export_duplis(object, &duplis)?;
            }
            if self.report.interrupted {
                return Ok(());
            }
        }
        if object.kind.is_geometry() && object.renders_emitter() {
            let geometry = self.export_geometry(object)?;
            if self.settings.export_nodes {
                let identity = IdentityHash::object(object.id);
                let name = object_name(object);
                self.write_node(
                    identity,
                    || ExportableNode::new(identity, name, object.id, NodeKind::Object),
                    Transform::from_mat4(&object.matrix_world_at(self.frame)),
                    geometry,
                    true,
                )?;
            }
        } else if object.kind.is_geometry() {
            tracing::debug!(object = %object.name, "emitter geometry suppressed");
        }
        Ok(())
    }

    fn write_node(
        &mut self,
        identity: IdentityHash,
        make: impl FnOnce() -> ExportableNode,
        transform: Transform,
        geometry: Option<PluginRef>,
        visible: bool,
    ) -> SceneportResult<()> {
        let (node, is_new) = self.cache.lookup_or_create(identity, make);
        let unchanged = !is_new
            && node.transform == transform
            && node.geometry == geometry
            && node.visible == visible;
        if unchanged {
            self.report.reused_nodes += 1;
            return Ok(());
        }
        node.transform = transform;
        node.geometry = geometry;
        node.visible = visible;
        let desc = node.to_plugin();
        tracing::trace!(node = %desc.name, is_new, "node exported");
        self.exporter.export_plugin(&desc)?;
        self.report.exported_nodes += 1;
        Ok(())
    }

    fn export_geometry(&mut self, object: &HostObject) -> SceneportResult<Option<PluginRef>> {
        if !object.kind.is_geometry() {
            return Ok(None);
        }
        let Some(mesh) = &object.mesh else {
            return Ok(None);
        };
        let name = format!("ME{}", sanitize_plugin_name(&mesh.name));
        let r = PluginRef::new(name.clone());
        if !self.settings.export_geometry || self.written_geometry.contains(&name) {
            return Ok(Some(r));
        }

        let stamp = object.geometry_stamp(self.frame);
        if !self.cache.geometry_changed(&name, stamp) {
            self.report.skipped_geometry += 1;
            self.written_geometry.insert(name);
            return Ok(Some(r));
        }
        let desc = mesh_plugin(&name, mesh, object.deforming)?;
        self.exporter.export_plugin(&desc)?;
        self.cache.mark_geometry(name.clone(), stamp);
        self.written_geometry.insert(name);
        self.report.exported_geometry += 1;
        Ok(Some(r))
    }

    fn dupli_source(&self, parent: &HostObject, id: ObjectId) -> SceneportResult<&'a HostObject> {
        let scene = self.scene;
        scene.object(id).ok_or_else(|| {
            SceneportError::validation(format!(
                "'{}' instances unknown object {}",
                parent.name, id.0
            ))
        })
    }

    fn export_duplis(&mut self, parent: &HostObject, duplis: &DupliList) -> SceneportResult<()> {
        for dup in duplis.objects() {
            if self.check_break() {
                return Ok(());
            }
            let source = self.dupli_source(parent, dup.source)?;
            if !source.kind.is_geometry() {
                continue;
            }
            let geometry = self.export_geometry(source)?;
            let identity = IdentityHash::instance(parent.id, source.id, &dup.persistent_id);
            let name = instance_name(parent, source, &dup.persistent_id);
            self.write_node(
                identity,
                || ExportableNode::new(identity, name, source.id, NodeKind::Instance),
                Transform::from_mat4(&dup.matrix),
                geometry,
                true,
            )?;
        }
        Ok(())
    }

    fn export_instancer(&mut self, parent: &HostObject, duplis: &DupliList) -> SceneportResult<()> {
        let mut prototypes: BTreeMap<u64, PluginRef> = BTreeMap::new();
        let mut items = Vec::with_capacity(duplis.len());
        for (i, dup) in duplis.objects().iter().enumerate() {
            if self.check_break() {
                return Ok(());
            }
            let source = self.dupli_source(parent, dup.source)?;
            if !source.kind.is_geometry() {
                continue;
            }
            let node = match prototypes.get(&source.id.0) {
                Some(r) => r.clone(),
                None => {
                    let geometry = self.export_geometry(source)?;
                    let identity = IdentityHash::instance(parent.id, source.id, &[]);
                    let name = format!(
                        "OB{}@{}",
                        sanitize_plugin_name(&source.name),
                        sanitize_plugin_name(&parent.name)
                    );
                    let r = PluginRef::new(name.clone());
                    self.write_node(
                        identity,
                        || ExportableNode::new(identity, name, source.id, NodeKind::Prototype),
                        Transform::IDENTITY,
                        geometry,
                        false,
                    )?;
                    prototypes.insert(source.id.0, r.clone());
                    r
                }
            };
            let index = instancer_index(dup, i)?;
            items.push(InstancerItem {
                index,
                transform: Transform::from_mat4(&dup.matrix),
                velocity: Transform::translation(Vector3::from(dup.velocity)),
                node,
            });
        }

        let geom_name = format!("IN{}", sanitize_plugin_name(&parent.name));
        let desc = PluginDesc::new(geom_name.clone(), "Instancer", PluginCategory::Geometry)
            .with(
                "instances",
                Instancer {
                    frame: self.frame,
                    items,
                },
            )
            .with("visible", true);
        self.exporter.export_plugin(&desc)?;
        self.report.exported_geometry += 1;

        let identity = IdentityHash::instancer(parent.id);
        let name = format!("OB{geom_name}");
        self.write_node(
            identity,
            || ExportableNode::new(identity, name, parent.id, NodeKind::Instancer),
            Transform::IDENTITY,
            Some(PluginRef::new(geom_name)),
            true,
        )
    }

    fn export_hair(&mut self, object: &HostObject) -> SceneportResult<()> {
        let systems: Vec<(usize, &ParticleSystem)> = object
            .render_particle_systems()
            .filter(|(_, p)| p.kind == ParticleKind::Hair && !p.strands.is_empty())
            .collect();
        for (index, system) in systems {
            let geom_name = format!(
                "HAIR{}{}",
                sanitize_plugin_name(&object.name),
                sanitize_plugin_name(&system.name)
            );
            let stamp = object.geometry_stamp(self.frame);
            if self.settings.export_geometry {
                if self.cache.geometry_changed(&geom_name, stamp) {
                    self.exporter.export_plugin(&hair_plugin(&geom_name, system))?;
                    self.cache.mark_geometry(geom_name.clone(), stamp);
                    self.report.exported_geometry += 1;
                } else {
                    self.report.skipped_geometry += 1;
                }
            }
            if self.settings.export_nodes {
                let identity = IdentityHash::hair(object.id, index);
                let name = format!("OB{geom_name}");
                self.write_node(
                    identity,
                    || ExportableNode::new(identity, name, object.id, NodeKind::Hair),
                    Transform::from_mat4(&object.matrix_world_at(self.frame)),
                    Some(PluginRef::new(geom_name)),
                    true,
                )?;
            }
        }
        Ok(())
    }

    fn export_light(&mut self, object: &HostObject) -> SceneportResult<()> {
        let lamp = object.lamp.ok_or_else(|| {
            SceneportError::validation(format!("lamp '{}' has no lamp data", object.name))
        })?;
        let desc = PluginDesc::new(
            format!("LA{}", sanitize_plugin_name(&object.name)),
            "LightOmni",
            PluginCategory::Light,
        )
        .with(
            "transform",
            Transform::from_mat4(&object.matrix_world_at(self.frame)),
        )
        .with("color", Color::from(lamp.color))
        .with("intensity", lamp.intensity)
        .with("enabled", true);
        self.exporter.export_plugin(&desc)?;
        Ok(())
    }
}

/// Instancer record index of the instance at list `position`, unique across the particle systems
/// and plain duplication of one duplicator.
pub fn instancer_index(dup: &DupliObject, position: usize) -> SceneportResult<i32> {
    let index = match (dup.particle_system, dup.particle_index) {
        (Some(system), Some(particle)) if particle < INSTANCER_SYSTEM_STRIDE => (system + 1)
            .checked_mul(INSTANCER_SYSTEM_STRIDE)
            .and_then(|base| base.checked_add(particle)),
        (Some(_), Some(_)) => None,
        _ => Some(position).filter(|&p| p < INSTANCER_SYSTEM_STRIDE),
    };
    index
        .and_then(|i| i32::try_from(i).ok())
        .ok_or_else(|| {
            SceneportError::encoding(format!(
                "instance {:?} has no representable instancer index",
                dup.persistent_id.as_slice()
            ))
        })
}

/// Plugin name of a top-level object's node.
pub fn object_name(object: &HostObject) -> String {
    format!("OB{}", sanitize_plugin_name(&object.name))
}

/// Plugin name of one instance: `OB<source>@<parent>_<path...>`.
pub fn instance_name(parent: &HostObject, source: &HostObject, path: &[i32]) -> String {
    let mut name = format!(
        "OB{}@{}",
        sanitize_plugin_name(&source.name),
        sanitize_plugin_name(&parent.name)
    );
    for p in path {
        name.push('_');
        name.push_str(&p.to_string());
    }
    name
}

fn mesh_plugin(name: &str, mesh: &MeshData, dynamic: bool) -> SceneportResult<PluginDesc> {
    let faces = mesh.triangles()?;
    let vertices: Vec<Vector3> = mesh.vertices.iter().map(|&v| Vector3::from(v)).collect();
    let mut desc = PluginDesc::new(name, "GeomStaticMesh", PluginCategory::Geometry)
        .with("vertices", vertices)
        .with("faces", faces.clone());

    if !mesh.uvs.is_empty() {
        if mesh.uvs.len() != mesh.vertices.len() {
            return Err(SceneportError::validation(format!(
                "mesh '{}' has {} uvs for {} vertices",
                mesh.name,
                mesh.uvs.len(),
                mesh.vertices.len()
            )));
        }
        let channel = MapChannel {
            index: 0,
            vertices: mesh
                .uvs
                .iter()
                .map(|uv| Vector3::new(uv[0], uv[1], 0.0))
                .collect(),
            faces,
        };
        desc.set(
            "map_channels",
            MapChannels {
                channels: vec![channel],
            },
        );
    }
    desc.set("dynamic_geometry", dynamic);
    Ok(desc)
}

fn hair_plugin(name: &str, system: &ParticleSystem) -> PluginDesc {
    let counts: Vec<i32> = system.strands.iter().map(|s| s.points.len() as i32).collect();
    let points: Vec<Vector3> = system
        .strands
        .iter()
        .flat_map(|s| s.points.iter().map(|&p| Vector3::from(p)))
        .collect();
    let widths: Vec<f32> = system
        .strands
        .iter()
        .flat_map(|s| std::iter::repeat_n(s.width, s.points.len()))
        .collect();
    PluginDesc::new(name, "GeomMayaHair", PluginCategory::Geometry)
        .with("num_hair_vertices", counts)
        .with("hair_vertices", points)
        .with("widths", AttrList::Float(widths))
}

#[cfg(test)]
#[path = "../../tests/unit/scene/walker.rs"]
mod tests;
