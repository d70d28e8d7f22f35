use super::*;
use crate::foundation::math::{AColor, Vector2};
use crate::plugin::desc::PluginCategory;
use crate::plugin::value::{InstancerItem, ListElem, MapChannel, PackedList, PluginRef};

fn mesh() -> PluginDesc {
    PluginDesc::new("MEcube", "GeomStaticMesh", PluginCategory::Geometry)
        .with(
            "vertices",
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.5, -2.0)],
        )
        .with("faces", vec![0, 1, 1])
}

#[test]
fn plain_block_layout() {
    let text = render_plugin(&mesh(), ExportFormat::Plain, None).unwrap();
    assert_eq!(
        text,
        "GeomStaticMesh MEcube {\n  vertices=ListVector(Vector(0, 0, 0), Vector(1, 0.5, -2));\n  faces=ListInt(0, 1, 1);\n}\n\n"
    );
}

#[test]
fn hex_lists_carry_the_hex_suffix() {
    let text = render_plugin(&mesh(), ExportFormat::Hex, None).unwrap();
    assert!(text.contains("faces=ListIntHex(\"000000000100000001000000\");"));
    let zip = render_plugin(&mesh(), ExportFormat::Zip, None).unwrap();
    assert!(zip.contains("faces=ListIntHex(\"ZIPB0C000000"));
}

#[test]
fn scalars_strings_and_references() {
    let d = PluginDesc::new("X", "Custom", PluginCategory::Effect)
        .with("i", -3)
        .with("f", 0.25f32)
        .with("s", "a \"q\" \\ b")
        .with("c", Color::from([1.0, 0.0, 0.5]))
        .with("r", PluginRef::with_output("tex", "out_alpha"));
    let text = render_plugin(&d, ExportFormat::Hex, None).unwrap();
    assert!(text.contains("  i=-3;\n"));
    assert!(text.contains("  f=0.25;\n"));
    assert!(text.contains("  s=\"a \\\"q\\\" \\\\ b\";\n"));
    assert!(text.contains("  c=Color(1, 0, 0.5);\n"));
    assert!(text.contains("  r=tex::out_alpha;\n"));
}

#[test]
fn compound_values() {
    assert_eq!(
        render_value(&AttrValue::Vector2(Vector2 { x: 1.5, y: 2.0 }), ExportFormat::Plain).unwrap(),
        "Vector(1.5, 2, 0)"
    );
    assert_eq!(
        render_value(
            &AttrValue::AColor(AColor { r: 1.0, g: 1.0, b: 1.0, a: 0.5 }),
            ExportFormat::Plain
        )
        .unwrap(),
        "AColor(1, 1, 1, 0.5)"
    );
    assert_eq!(
        render_value(
            &Transform::translation(Vector3::new(1.0, 2.0, 3.0)).into(),
            ExportFormat::Plain
        )
        .unwrap(),
        "Transform(Matrix(Vector(1, 0, 0), Vector(0, 1, 0), Vector(0, 0, 1)), Vector(1, 2, 3))"
    );
    assert_eq!(
        render_value(
            &AttrList::String(vec!["a".into(), "b".into()]).into(),
            ExportFormat::Zip
        )
        .unwrap(),
        "List(\"a\", \"b\")"
    );
}

#[test]
fn map_channels_and_instancer_layout() {
    let mc = MapChannels {
        channels: vec![MapChannel {
            index: 0,
            vertices: vec![Vector3::new(0.0, 1.0, 0.0)],
            faces: vec![0, 0, 0],
        }],
    };
    assert_eq!(
        render_value(&mc.into(), ExportFormat::Plain).unwrap(),
        "List(List(0, ListVector(Vector(0, 1, 0)), ListInt(0, 0, 0)))"
    );

    let inst = Instancer {
        frame: 4,
        items: vec![InstancerItem {
            index: 7,
            transform: Transform::IDENTITY,
            velocity: Transform::IDENTITY,
            node: PluginRef::new("OBproto"),
        }],
    };
    let text = render_value(&inst.into(), ExportFormat::Hex).unwrap();
    assert!(text.starts_with("List(4, List(7, Transform("));
    assert!(text.ends_with(", OBproto))"));
}

#[test]
fn non_finite_floats_are_rejected() {
    let d = PluginDesc::new("L", "LightOmni", PluginCategory::Light).with("intensity", f32::NAN);
    let err = render_plugin(&d, ExportFormat::Plain, None).unwrap_err();
    assert!(matches!(err, SceneportError::Encoding(ref m) if m.contains("L.intensity")));
}

#[test]
fn inconsistent_packed_list_writes_nothing() {
    let bad = AttrList::Packed(PackedList {
        elem: ListElem::Vector,
        count: 2,
        bytes: vec![0; 13],
    });
    let d = PluginDesc::new("MEbad", "GeomStaticMesh", PluginCategory::Geometry).with("vertices", bad);
    let mut w = PluginWriter::new("t", Vec::new(), ExportFormat::Hex);
    assert!(matches!(w.write_plugin(&d), Err(SceneportError::Encoding(_))));
    assert_eq!(w.plugins_written(), 0);
    assert!(w.into_inner().is_empty());
}

#[test]
fn keyed_values_are_wrapped() {
    let d = PluginDesc::new("OBa", "Node", PluginCategory::Object).with("visible", true);
    let text = render_plugin(&d, ExportFormat::Plain, Some(12)).unwrap();
    assert!(text.contains("  visible=interpolate((12, 1));\n"));
}

#[test]
fn includes_are_written_first_and_once() {
    let mut w = PluginWriter::new("scene.vrscene", Vec::new(), ExportFormat::Hex);
    w.include("scene_nodes.vrscene").unwrap();
    w.include("scene_nodes.vrscene").unwrap();
    w.write_plugin(&mesh()).unwrap();
    w.include("scene_lights.vrscene").unwrap();
    w.flush().unwrap();
    let text = String::from_utf8(w.into_inner()).unwrap();
    assert!(text.starts_with("#include \"scene_nodes.vrscene\"\n\nGeomStaticMesh MEcube {"));
    assert_eq!(text.matches("scene_nodes").count(), 1);
    assert!(text.ends_with("#include \"scene_lights.vrscene\"\n"));
}

#[test]
fn unknown_attributes_never_reach_output() {
    let d = PluginDesc::new("OBa", "Node", PluginCategory::Object)
        .with("visible", 1)
        .with("bogus", 2);
    let text = render_plugin(&conform(&d).unwrap(), ExportFormat::Plain, None).unwrap();
    assert!(!text.contains("bogus"));
}
