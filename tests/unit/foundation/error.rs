use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        SceneportError::init("x")
            .to_string()
            .contains("renderer init error:")
    );
    assert!(
        SceneportError::encoding("x")
            .to_string()
            .contains("encoding error:")
    );
    assert!(
        SceneportError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        SceneportError::renderer("x")
            .to_string()
            .contains("renderer error:")
    );
    assert!(
        SceneportError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn object_local_classification() {
    assert!(SceneportError::encoding("bad list").is_object_local());
    assert!(SceneportError::validation("bad face").is_object_local());
    assert!(!SceneportError::init("no license").is_object_local());
    assert!(!SceneportError::Io(std::io::Error::other("disk full")).is_object_local());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = SceneportError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn json_errors_map_to_serde() {
    let err: SceneportError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, SceneportError::Serde(_)));
}
