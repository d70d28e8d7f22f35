use super::*;

#[test]
fn resize_keeps_uniform_color_and_progress() {
    let img = RenderImage::filled(Resolution::new(8, 4).unwrap(), [0.5, 0.25, 1.0, 1.0], 0.75);
    let small = img.resized(Resolution::new(3, 2).unwrap()).unwrap();
    assert_eq!(small.size(), Resolution::new(3, 2).unwrap());
    assert_eq!(small.pixels.len(), 3 * 2 * 4);
    assert!(small.pixels.chunks(4).all(|p| (p[0] - 0.5).abs() < 1e-4 && (p[2] - 1.0).abs() < 1e-4));
    assert_eq!(small.progress, 0.75);
}

#[test]
fn rgba8_is_clamped() {
    let img = RenderImage::filled(Resolution::new(1, 1).unwrap(), [2.0, -1.0, 0.5, 1.0], 1.0);
    assert_eq!(img.to_rgba8().unwrap().get_pixel(0, 0).0, [255, 0, 128, 255]);
}

#[test]
fn mismatched_buffers_are_rejected() {
    let img = RenderImage {
        width: 2,
        height: 2,
        pixels: vec![0.0; 3],
        progress: 0.0,
    };
    assert!(matches!(img.to_rgba8(), Err(SceneportError::Renderer(_))));
}

#[test]
fn png_is_written() {
    let dir = std::env::temp_dir().join(format!("sceneport_png_{}", std::process::id()));
    let path = dir.join("out.png");
    RenderImage::filled(Resolution::new(4, 4).unwrap(), [1.0, 0.0, 0.0, 1.0], 1.0)
        .save_png(&path)
        .unwrap();
    let back = image::open(&path).unwrap().to_rgba8();
    assert_eq!(back.get_pixel(2, 2).0, [255, 0, 0, 255]);
    let _ = std::fs::remove_dir_all(&dir);
}
