use super::*;
use crate::export::MemoryExporter;
use crate::host::context::HostContext;
use crate::host::memory::{MemoryScene, RecordingEngine, SceneDef};
use crate::host::model::{
    DupliDef, HairStrand, LampData, LocationKey, Modifier, Particle, SmokeRole,
};

fn cube(id: u64, name: &str) -> HostObject {
    let mut ob = HostObject::new(id, name, ObjectKind::Mesh);
    ob.mesh = Some(MeshData {
        name: format!("{name}Mesh"),
        vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        polygons: vec![vec![0, 1, 2, 3]],
        uvs: vec![],
    });
    ob
}

fn emitter(id: u64, render_emitter: bool, instance: u64) -> HostObject {
    let mut ob = cube(id, "Emitter");
    ob.particle_systems.push(ParticleSystem {
        name: "Spray".into(),
        render_emitter,
        kind: ParticleKind::Emitter,
        particles: vec![
            Particle {
                location: [0.0, 0.0, 1.0],
                velocity: [0.0, 0.0, 0.5],
            },
            Particle {
                location: [0.0, 0.0, 2.0],
                velocity: [0.0, 0.0, 0.5],
            },
        ],
        instance_object: Some(ObjectId(instance)),
        strands: vec![],
    });
    ob.modifiers.push(Modifier::ParticleSystem {
        system: 0,
        show_render: true,
    });
    ob
}

struct Harness {
    scene: MemoryScene,
    engine: RecordingEngine,
    settings: RenderSettings,
    cache: NodeCache,
    exporter: MemoryExporter,
    context: HostContext,
}

impl Harness {
    fn new(def: SceneDef) -> Self {
        Self {
            scene: MemoryScene::new(def).unwrap(),
            engine: RecordingEngine::new(),
            settings: RenderSettings::default(),
            cache: NodeCache::new(),
            exporter: MemoryExporter::new(),
            context: HostContext::new(),
        }
    }

    fn walk(&mut self, frame: i32) -> WalkReport {
        let guard = self.context.enter();
        SceneWalker::new(
            &self.scene,
            &self.engine,
            &self.settings,
            &mut self.cache,
            &mut self.exporter,
        )
        .run(&guard, frame)
        .unwrap()
    }

    fn names(&self) -> Vec<&str> {
        self.exporter.names()
    }
}

#[test]
fn hidden_excluded_and_domain_objects_are_never_exported() {
    let mut hidden = cube(1, "Hidden");
    hidden.hide_render = true;
    let mut other_layer = cube(2, "Other");
    other_layer.layers = 0b10;
    let mut domain = cube(3, "Domain");
    domain.modifiers.push(Modifier::Smoke {
        role: SmokeRole::Domain,
    });
    let mut flow = cube(4, "Flow");
    flow.modifiers.push(Modifier::Smoke {
        role: SmokeRole::Flow,
    });
    let mut h = Harness::new(
        SceneDef::new("s")
            .object(hidden)
            .object(other_layer)
            .object(domain)
            .object(flow),
    );
    let report = h.walk(1);

    assert_eq!(h.names(), vec!["MEFlowMesh", "OBFlow"]);
    assert_eq!(report.skipped_objects, 3);
    assert_eq!((report.exported_nodes, report.exported_geometry), (1, 1));
}

#[test]
fn layer_filter_can_be_disabled() {
    let mut other_layer = cube(2, "Other");
    other_layer.layers = 0b10;
    let mut h = Harness::new(SceneDef::new("s").object(other_layer));
    h.settings.use_active_layers = false;
    h.walk(1);
    assert!(h.names().contains(&"OBOther"));
}

#[test]
fn emitter_geometry_is_suppressed_without_render_emitter() {
    let mut ball = cube(2, "Ball");
    ball.hide_render = true;
    let mut h = Harness::new(SceneDef::new("s").object(emitter(1, false, 2)).object(ball));
    h.walk(1);

    let names = h.names();
    assert!(!names.contains(&"OBEmitter"));
    assert!(!names.contains(&"MEEmitterMesh"));
    assert!(names.contains(&"OBBall@Emitter_0_0"));
    assert!(names.contains(&"OBBall@Emitter_0_1"));
    assert!(names.contains(&"MEBallMesh"), "hidden dupli source geometry is still exported");
    assert!(!names.contains(&"OBBall"));
    assert_eq!(h.scene.live_dupli_lists(), 0);
}

#[test]
fn render_emitter_exports_the_base_object_too() {
    let mut h = Harness::new(
        SceneDef::new("s")
            .object(emitter(1, true, 2))
            .object(cube(2, "Ball")),
    );
    h.walk(1);
    let names = h.names();
    assert!(names.contains(&"OBEmitter"));
    assert!(names.contains(&"OBBall@Emitter_0_1"));
}

#[test]
fn duplicator_with_render_emitter_keeps_its_base_object() {
    let mut spawner = emitter(1, true, 2);
    spawner.dupli = Some(DupliDef::Array {
        object: ObjectId(2),
        count: 2,
        offset: [1.0, 0.0, 0.0],
    });
    let mut ball = cube(2, "Ball");
    ball.hide_render = true;
    let mut h = Harness::new(SceneDef::new("s").object(spawner).object(ball));
    h.walk(1);

    let names = h.names();
    assert!(names.contains(&"OBEmitter"));
    assert!(names.contains(&"MEEmitterMesh"));
    for inst in ["OBBall@Emitter_0", "OBBall@Emitter_1", "OBBall@Emitter_0_0", "OBBall@Emitter_0_1"] {
        assert!(names.contains(&inst), "{inst} missing from {names:?}");
    }
}

#[test]
fn duplicator_without_render_emitter_drops_its_base_object() {
    let mut spawner = emitter(1, false, 2);
    spawner.dupli = Some(DupliDef::Array {
        object: ObjectId(2),
        count: 2,
        offset: [1.0, 0.0, 0.0],
    });
    let mut ball = cube(2, "Ball");
    ball.hide_render = true;
    let mut h = Harness::new(SceneDef::new("s").object(spawner).object(ball));
    h.walk(1);

    let names = h.names();
    assert!(!names.contains(&"OBEmitter"));
    assert!(names.contains(&"OBBall@Emitter_1"));
    assert!(names.contains(&"OBBall@Emitter_0_1"));
}

#[test]
fn vanished_nodes_are_hidden_once_then_forgotten() {
    let mut h = Harness::new(SceneDef::new("s").object(cube(1, "Stay")).object(cube(2, "Gone")));
    let first = h.walk(1);
    assert_eq!((first.exported_nodes, first.retired_nodes), (2, 0));

    let mut gone = cube(2, "Gone");
    gone.hide_render = true;
    h.scene = MemoryScene::new(SceneDef::new("s").object(cube(1, "Stay")).object(gone)).unwrap();
    h.exporter.clear();
    let second = h.walk(2);
    assert_eq!(second.retired_nodes, 1);
    assert_eq!(second.reused_nodes, 1);
    assert_eq!(h.names(), vec!["OBGone"]);
    let retired = h.exporter.find("OBGone").unwrap();
    assert_eq!(retired.get("visible"), Some(&false.into()));
    assert_eq!(h.cache.len(), 1);

    h.exporter.clear();
    let third = h.walk(3);
    assert_eq!(third.retired_nodes, 0);
    assert!(h.names().is_empty());
}

#[test]
fn returning_nodes_are_exported_visible_again() {
    let mut h = Harness::new(SceneDef::new("s").object(cube(1, "Blink")));
    h.walk(1);
    let mut off = cube(1, "Blink");
    off.layers = 0b10;
    h.scene = MemoryScene::new(SceneDef::new("s").object(off)).unwrap();
    assert_eq!(h.walk(2).retired_nodes, 1);

    h.scene = MemoryScene::new(SceneDef::new("s").object(cube(1, "Blink"))).unwrap();
    h.exporter.clear();
    let back = h.walk(3);
    assert_eq!((back.exported_nodes, back.retired_nodes), (1, 0));
    assert_eq!(h.exporter.find("OBBlink").unwrap().get("visible"), Some(&true.into()));
}

#[test]
fn dead_particles_retire_their_instances() {
    let mut ball = cube(2, "Ball");
    ball.hide_render = true;
    let mut h = Harness::new(
        SceneDef::new("s")
            .object(emitter(1, false, 2))
            .object(ball.clone()),
    );
    h.walk(1);
    assert!(h.names().contains(&"OBBall@Emitter_0_1"));

    let mut spent = emitter(1, false, 2);
    spent.particle_systems[0].particles.truncate(1);
    h.scene = MemoryScene::new(SceneDef::new("s").object(spent).object(ball)).unwrap();
    h.exporter.clear();
    let report = h.walk(2);
    assert_eq!(report.retired_nodes, 1);
    assert_eq!(h.names(), vec!["OBBall@Emitter_0_1"]);
    let dead = h.exporter.find("OBBall@Emitter_0_1").unwrap();
    assert_eq!(dead.get("visible"), Some(&false.into()));
}

#[test]
fn interrupted_walks_retire_nothing() {
    let mut h = Harness::new(SceneDef::new("s").object(cube(1, "A")).object(cube(2, "B")));
    h.walk(1);
    h.exporter.clear();
    h.engine.request_break();
    let report = h.walk(2);
    assert!(report.interrupted);
    assert_eq!(report.retired_nodes, 0);
    assert!(h.names().is_empty());
    assert_eq!(h.cache.len(), 2);
}

#[test]
fn unchanged_objects_are_reused_across_frames() {
    let mut mover = cube(2, "Mover");
    mover.location_keys = vec![
        LocationKey {
            frame: 1,
            location: [0.0; 3],
        },
        LocationKey {
            frame: 3,
            location: [2.0, 0.0, 0.0],
        },
    ];
    let mut h = Harness::new(SceneDef::new("s").object(cube(1, "Still")).object(mover));

    let first = h.walk(1);
    assert_eq!((first.exported_nodes, first.exported_geometry), (2, 2));

    h.exporter.clear();
    let second = h.walk(2);
    assert_eq!(second.reused_nodes, 1);
    assert_eq!(second.exported_nodes, 1);
    assert_eq!(second.skipped_geometry, 2);
    assert_eq!(h.names(), vec!["OBMover"]);
    assert_eq!(h.cache.len(), 2);

    let id = IdentityHash::object(ObjectId(1));
    let (_, is_new) = h.cache.lookup_or_create(id, || panic!("still cached"));
    assert!(!is_new);
}

#[test]
fn deforming_geometry_is_exported_every_frame() {
    let mut blob = cube(1, "Blob");
    blob.deforming = true;
    let mut h = Harness::new(SceneDef::new("s").object(blob));
    assert_eq!(h.walk(1).exported_geometry, 1);
    assert_eq!(h.walk(2).exported_geometry, 1);
    let mesh = h.exporter.find("MEBlobMesh").unwrap();
    assert_eq!(mesh.get("dynamic_geometry"), Some(&1.into()));
}

#[test]
fn shared_meshes_are_written_once_per_pass() {
    let a = cube(1, "A");
    let mut b = cube(2, "B");
    b.mesh = a.mesh.clone();
    let mut h = Harness::new(SceneDef::new("s").object(a).object(b));
    let report = h.walk(1);
    assert_eq!(report.exported_geometry, 1);
    assert_eq!(h.exporter.count_of("GeomStaticMesh"), 1);
    assert_eq!(h.exporter.count_of("Node"), 2);
}

#[test]
fn broken_objects_are_skipped_and_reported() {
    let mut broken = cube(1, "Broken");
    if let Some(mesh) = broken.mesh.as_mut() {
        mesh.polygons = vec![vec![0, 1, 9]];
    }
    let mut h = Harness::new(SceneDef::new("s").object(broken).object(cube(2, "Fine")));
    let report = h.walk(1);

    assert_eq!(report.failed, 1);
    assert!(!report.interrupted);
    assert_eq!(h.names(), vec!["MEFineMesh", "OBFine"]);
    let warnings = h.engine.log().messages(ReportLevel::Warning).len();
    assert_eq!(warnings, 1);
}

#[test]
fn interruption_stops_the_walk_without_error() {
    let mut h = Harness::new(SceneDef::new("s").object(cube(1, "A")).object(cube(2, "B")));
    h.engine.request_break();
    let report = h.walk(1);
    assert!(report.interrupted);
    assert!(h.names().is_empty());
    let log = h.engine.log();
    assert_eq!(log.messages(ReportLevel::Warning), vec!["Export interrupted!"]);
    assert_eq!(log.progress, vec![0.0]);
}

#[test]
fn interruption_is_checked_between_instances() {
    let mut arr = HostObject::new(1, "Arr", ObjectKind::Empty);
    arr.dupli = Some(DupliDef::Array {
        object: ObjectId(2),
        count: 10,
        offset: [1.0, 0.0, 0.0],
    });
    let mut src = cube(2, "Src");
    src.hide_render = true;
    let mut h = Harness::new(SceneDef::new("s").object(arr).object(src));
    // One check before the object, then one per instance.
    let checks = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let c = std::sync::Arc::clone(&checks);
    h.engine.break_when(move |_| c.fetch_add(1, std::sync::atomic::Ordering::SeqCst) >= 4);
    let report = h.walk(1);

    assert!(report.interrupted);
    assert_eq!(h.exporter.count_of("Node"), 3);
    assert_eq!(h.scene.live_dupli_lists(), 0);
}

#[test]
fn instancer_mode_writes_one_instancer() {
    let mut h = Harness::new(
        SceneDef::new("s")
            .object(emitter(1, false, 2))
            .object(cube(2, "Ball")),
    );
    h.settings.use_instancer = true;
    h.walk(4);

    let inst = h.exporter.find("INEmitter").unwrap();
    let Some(crate::plugin::value::AttrValue::Instancer(records)) = inst.get("instances") else {
        panic!("instancer records missing");
    };
    assert_eq!(records.frame, 4);
    assert_eq!(records.items.len(), 2);
    assert_eq!(records.items[1].index, INSTANCER_SYSTEM_STRIDE as i32 + 1);
    assert_eq!(records.items[0].node, PluginRef::new("OBBall@Emitter"));
    assert_eq!(records.items[0].velocity.offset, Vector3::new(0.0, 0.0, 0.5));

    let proto = h.exporter.find("OBBall@Emitter").unwrap();
    assert_eq!(proto.get("visible"), Some(&false.into()));
    assert!(h.exporter.find("OBINEmitter").is_some());
    assert_eq!(h.exporter.count_of("Node"), 3, "prototype, instancer node, ball");
}

#[test]
fn instancer_indices_are_unique_across_particle_systems() {
    let mut twin = emitter(1, false, 2);
    let mut second = twin.particle_systems[0].clone();
    second.name = "Mist".into();
    twin.particle_systems.push(second);
    twin.modifiers.push(Modifier::ParticleSystem {
        system: 1,
        show_render: true,
    });
    let mut h = Harness::new(SceneDef::new("s").object(twin).object(cube(2, "Ball")));
    h.settings.use_instancer = true;
    h.walk(1);

    let inst = h.exporter.find("INEmitter").unwrap();
    let Some(crate::plugin::value::AttrValue::Instancer(records)) = inst.get("instances") else {
        panic!("instancer records missing");
    };
    assert_eq!(records.items.len(), 4);
    let mut indices: Vec<i32> = records.items.iter().map(|r| r.index).collect();
    indices.sort_unstable();
    indices.dedup();
    assert_eq!(indices.len(), 4, "{indices:?}");
}

#[test]
fn instancer_index_folds_in_the_particle_system() {
    let m = crate::foundation::math::MAT4_IDENTITY;
    let p = Particle {
        location: [0.0; 3],
        velocity: [0.0; 3],
    };
    let a = DupliObject::particle(ObjectId(2), 0, 3, &p);
    let b = DupliObject::particle(ObjectId(2), 1, 3, &p);
    assert_ne!(instancer_index(&a, 0).unwrap(), instancer_index(&b, 0).unwrap());
    assert_eq!(instancer_index(&a, 9).unwrap(), INSTANCER_SYSTEM_STRIDE as i32 + 3);

    let plain = DupliObject::new(ObjectId(2), &[5], m);
    assert_eq!(instancer_index(&plain, 7).unwrap(), 7);
    let overflow = DupliObject::particle(ObjectId(2), 400, 0, &p);
    assert!(matches!(
        instancer_index(&overflow, 0),
        Err(SceneportError::Encoding(_))
    ));
}

#[test]
fn hair_and_lights_are_exported() {
    let mut furry = cube(1, "Furry");
    furry.particle_systems.push(ParticleSystem {
        name: "Fur".into(),
        render_emitter: true,
        kind: ParticleKind::Hair,
        particles: vec![],
        instance_object: None,
        strands: vec![
            HairStrand {
                points: vec![[0.0; 3], [0.0, 0.0, 1.0]],
                width: 0.1,
            },
            HairStrand {
                points: vec![[1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [1.0, 0.0, 2.0]],
                width: 0.2,
            },
        ],
    });
    furry.modifiers.push(Modifier::ParticleSystem {
        system: 0,
        show_render: true,
    });
    let mut lamp = HostObject::new(2, "Key", ObjectKind::Lamp);
    lamp.lamp = Some(LampData {
        color: [1.0, 0.9, 0.8],
        intensity: 3.0,
    });
    let mut h = Harness::new(SceneDef::new("s").object(furry).object(lamp));
    h.walk(1);

    let hair = h.exporter.find("HAIRFurryFur").unwrap();
    assert_eq!(hair.get("num_hair_vertices"), Some(&vec![2, 3].into()));
    assert_eq!(
        hair.get("widths"),
        Some(&vec![0.1f32, 0.1, 0.2, 0.2, 0.2].into())
    );
    assert!(h.exporter.find("OBHAIRFurryFur").is_some());
    assert!(h.exporter.find("OBFurry").is_some());
    let light = h.exporter.find("LAKey").unwrap();
    assert_eq!(light.get("intensity"), Some(&3.0f32.into()));

    let mut h2 = Harness::new(h.scene.def().clone());
    h2.settings.export_hair = false;
    h2.settings.export_lights = false;
    h2.walk(1);
    assert!(h2.exporter.find("HAIRFurryFur").is_none());
    assert!(h2.exporter.find("LAKey").is_none());
}

#[test]
fn progress_is_coarse_and_monotonic() {
    let mut def = SceneDef::new("big");
    for i in 0..2001u64 {
        def = def.object(HostObject::new(i + 1, format!("E{i}"), ObjectKind::Empty));
    }
    let mut h = Harness::new(def);
    h.walk(1);
    let progress = h.engine.log().progress;
    assert_eq!(progress.len(), 4);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&1.0));
}

#[test]
fn progress_can_be_silenced() {
    let mut h = Harness::new(SceneDef::new("s").object(cube(1, "A")));
    let guard = h.context.enter();
    SceneWalker::new(&h.scene, &h.engine, &h.settings, &mut h.cache, &mut h.exporter)
        .report_progress(false)
        .run(&guard, 1)
        .unwrap();
    drop(guard);
    assert!(h.engine.log().progress.is_empty());
}
