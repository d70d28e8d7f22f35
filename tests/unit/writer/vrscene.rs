use super::*;
use crate::foundation::math::Vector3;
use crate::writer::decode::{parse_includes, parse_plugins};

fn node(name: &str) -> PluginDesc {
    PluginDesc::new(name, "Node", PluginCategory::Object).with("geometry", PluginRef::new("MEa"))
}

fn mesh(name: &str) -> PluginDesc {
    PluginDesc::new(name, "GeomStaticMesh", PluginCategory::Geometry)
        .with("vertices", vec![Vector3::new(1.0, 2.0, 3.0)])
}

#[test]
fn single_file_holds_every_plugin() {
    let outputs = MemoryOutputs::new();
    let mut ex = VrsceneExporter::new(VrsceneOpts::new("scene"), outputs.clone()).unwrap();
    ex.export_plugin(&mesh("MEa")).unwrap();
    ex.export_plugin(&node("OBa")).unwrap();
    ex.flush().unwrap();

    assert_eq!(outputs.file_names(), vec!["scene.vrscene".to_string()]);
    let text = outputs.contents("scene.vrscene").unwrap();
    let names: Vec<_> = parse_plugins(&text)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["MEa", "OBa"]);
    assert_eq!(ex.plugins_written(), 2);
}

#[test]
fn split_mode_opens_partitions_lazily_and_includes_them() {
    let outputs = MemoryOutputs::new();
    let opts = VrsceneOpts {
        base_name: "shot".into(),
        format: ExportFormat::Zip,
        split: true,
    };
    let mut ex = VrsceneExporter::new(opts, outputs.clone()).unwrap();
    ex.export_plugin(&node("OBa")).unwrap();
    ex.export_plugin(&mesh("MEa")).unwrap();
    ex.export_plugin(&node("OBb")).unwrap();
    ex.flush().unwrap();

    assert_eq!(
        outputs.file_names(),
        vec![
            "shot.vrscene".to_string(),
            "shot_geometry.vrscene".to_string(),
            "shot_nodes.vrscene".to_string(),
        ]
    );
    let main = outputs.contents("shot.vrscene").unwrap();
    assert_eq!(
        parse_includes(&main).unwrap(),
        vec!["shot_nodes.vrscene".to_string(), "shot_geometry.vrscene".to_string()]
    );
    assert!(parse_plugins(&main).unwrap().is_empty());
    let nodes = parse_plugins(&outputs.contents("shot_nodes.vrscene").unwrap()).unwrap();
    assert_eq!(nodes.len(), 2);
    let geom = outputs.contents("shot_geometry.vrscene").unwrap();
    assert!(geom.contains("ListVectorHex(\"ZIPB"));
}

#[test]
fn frame_keys_reach_partitions_opened_later() {
    let outputs = MemoryOutputs::new();
    let opts = VrsceneOpts {
        split: true,
        ..VrsceneOpts::new("anim")
    };
    let mut ex = VrsceneExporter::new(opts, outputs.clone()).unwrap();
    ex.set_current_frame(Some(3)).unwrap();
    ex.export_plugin(&node("OBa")).unwrap();
    let text = outputs.contents("anim_nodes.vrscene").unwrap();
    assert!(text.contains("geometry=interpolate((3, MEa));"));
}

#[test]
fn file_outputs_create_the_directory() {
    let dir = std::env::temp_dir().join(format!("sceneport_vrscene_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let mut ex = VrsceneExporter::new(VrsceneOpts::new("one"), FileOutputs::new(&dir)).unwrap();
    ex.export_plugin(&node("OBa")).unwrap();
    ex.flush().unwrap();
    let text = std::fs::read_to_string(dir.join("one.vrscene")).unwrap();
    assert!(text.starts_with("Node OBa {"));
    let _ = std::fs::remove_dir_all(&dir);
}
