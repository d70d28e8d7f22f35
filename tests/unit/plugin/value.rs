use super::*;

#[test]
fn packed_list_length_must_match_count() {
    let ok = PackedList {
        elem: ListElem::Int,
        count: 2,
        bytes: vec![1, 0, 0, 0, 2, 0, 0, 0],
    };
    assert_eq!(ok.unpack().unwrap(), AttrList::Int(vec![1, 2]));

    let bad = PackedList {
        elem: ListElem::Vector,
        count: 2,
        bytes: vec![0; 12],
    };
    let err = bad.check().unwrap_err();
    assert!(matches!(err, SceneportError::Encoding(_)));
}

#[test]
fn le_bytes_decode_preserves_float_bits() {
    let values = vec![0.1f32, -0.0, f32::MIN_POSITIVE, 3.5e7];
    let list = AttrList::Float(values.clone());
    let bytes = list.to_le_bytes().unwrap().unwrap();
    let AttrList::Float(back) = AttrList::from_le_bytes(ListElem::Float, &bytes).unwrap() else {
        panic!("expected float list");
    };
    let bits = |v: &[f32]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&back), bits(&values));
}

#[test]
fn ragged_payload_is_an_encoding_error() {
    assert!(AttrList::from_le_bytes(ListElem::Color, &[0u8; 13]).is_err());
}

#[test]
fn string_lists_have_no_binary_form() {
    let list = AttrList::String(vec!["a".into()]);
    assert_eq!(list.elem(), None);
    assert_eq!(list.to_le_bytes().unwrap(), None);
}

#[test]
fn attr_types_follow_variants() {
    assert_eq!(AttrValue::from(true).attr_type(), AttrType::Int);
    assert_eq!(AttrValue::from(vec![1.0f32]).attr_type(), AttrType::ListFloat);
    let packed = AttrValue::List(AttrList::Packed(PackedList {
        elem: ListElem::Vector,
        count: 0,
        bytes: vec![],
    }));
    assert_eq!(packed.attr_type(), AttrType::ListVector);
}

#[test]
fn plugin_ref_display_includes_output() {
    assert_eq!(PluginRef::new("MEcube").to_string(), "MEcube");
    assert_eq!(
        PluginRef::with_output("TEnoise", "color").to_string(),
        "TEnoise::color"
    );
}
