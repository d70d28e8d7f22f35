use super::*;

#[test]
fn single_frame_reports_raw_fraction() {
    let mut p = ProgressTracker::new(1);
    assert_eq!(p.frame_progress(0.25), 0.25);
    assert_eq!(p.frame_progress(0.75), 0.75);
    assert_eq!(p.finish(), 1.0);
}

#[test]
fn animation_composes_frames_and_never_decreases() {
    let mut p = ProgressTracker::new(4);
    let mut seen = Vec::new();
    for _ in 0..4 {
        for f in [0.5, 0.25, 1.0] {
            seen.push(p.frame_progress(f));
        }
        seen.push(p.frame_done());
    }
    seen.push(p.finish());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen[0], 0.125);
    assert_eq!(seen[3], 0.25);
    assert_eq!(*seen.last().unwrap(), 1.0);
    assert_eq!(p.frames_done(), 4);
}

#[test]
fn bad_fractions_are_clamped() {
    let mut p = ProgressTracker::new(2);
    assert_eq!(p.frame_progress(f32::NAN), 0.0);
    assert_eq!(p.frame_progress(7.0), 0.5);
    assert_eq!(p.frame_progress(-1.0), 0.5);
    assert_eq!(ProgressTracker::new(0).total(), 1);
}
