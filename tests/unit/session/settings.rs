use super::*;

#[test]
fn defaults_from_empty_json() {
    let s = RenderSettings::from_json_str("{}").unwrap();
    assert_eq!(s, RenderSettings::default());
    assert!(!s.is_animation());
    assert_eq!(s.live_target(), Some(&LiveTarget::default()));
    assert_eq!(s.poll_interval(), Duration::from_millis(50));
}

#[test]
fn file_target_json() {
    let s = RenderSettings::from_json_str(
        r#"{
            "animation": {"mode": "camera_loop"},
            "frame_range": {"start": 1, "end": 10, "step": 2},
            "target": {"file": {"path": "out/shot.vrscene", "format": "zip", "split": true}},
            "use_instancer": true
        }"#,
    )
    .unwrap();
    assert_eq!(s.animation.mode, AnimationMode::CameraLoop);
    assert!(s.is_animation());
    let f = s.file_target().unwrap();
    assert_eq!(f.format, ExportFormat::Zip);
    assert!(f.split);
    let (dir, base) = f.resolve(Path::new("/exports")).unwrap();
    assert_eq!(dir, PathBuf::from("/exports/out"));
    assert_eq!(base, "shot");
}

#[test]
fn poll_interval_is_bounded() {
    for bad in [0, MAX_POLL_INTERVAL_MS + 1] {
        let s = RenderSettings {
            poll_interval_ms: bad,
            ..RenderSettings::default()
        };
        assert!(matches!(s.validate(), Err(SceneportError::Validation(_))));
    }
}

#[test]
fn invalid_ranges_and_resolutions_are_rejected() {
    assert!(RenderSettings::from_json_str(r#"{"frame_range": {"start": 5, "end": 1}}"#).is_err());
    assert!(
        RenderSettings::from_json_str(r#"{"resolution": {"width": 0, "height": 10}}"#).is_err()
    );
    assert!(matches!(
        RenderSettings::from_json_str(r#"{"animation": {"mode": "sideways"}}"#),
        Err(SceneportError::Serde(_))
    ));
}

#[test]
fn absolute_file_targets_ignore_export_dir() {
    let f = FileTarget {
        path: PathBuf::from("/abs/scene.vrscene"),
        format: ExportFormat::Hex,
        split: false,
    };
    let (dir, base) = f.resolve(Path::new("/elsewhere")).unwrap();
    assert_eq!((dir, base.as_str()), (PathBuf::from("/abs"), "scene"));
}
