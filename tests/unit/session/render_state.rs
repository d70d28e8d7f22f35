use super::*;
use crate::foundation::core::Resolution;
use crate::renderer::image::PassType;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

const POLL: Duration = Duration::from_millis(5);

#[test]
fn ready_from_another_thread_unblocks_the_wait() {
    let state = Arc::new(RenderState::new());
    state.begin_frame(3, Vec::new());
    assert!(state.is_running());

    let s2 = Arc::clone(&state);
    let t = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        s2.mark_ready(3);
    });
    assert_eq!(state.wait_frame(3, POLL, || false), WaitOutcome::Ready);
    t.join().unwrap();
    assert!(!state.is_running());
}

#[test]
fn stale_frames_do_not_satisfy_the_wait() {
    let state = RenderState::new();
    state.begin_frame(2, Vec::new());
    state.mark_ready(1);
    assert!(state.is_running());
    let checks = AtomicUsize::new(0);
    let out = state.wait_frame(2, POLL, || checks.fetch_add(1, Ordering::SeqCst) >= 2);
    assert_eq!(out, WaitOutcome::Interrupted);
    assert_eq!(checks.load(Ordering::SeqCst), 3);
}

#[test]
fn interruption_is_polled_at_the_interval() {
    let state = RenderState::new();
    state.begin_frame(1, Vec::new());
    let started = Instant::now();
    let out = state.wait_frame(1, POLL, || started.elapsed() > Duration::from_millis(30));
    assert_eq!(out, WaitOutcome::Interrupted);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn aborts_and_shutdown_end_the_wait() {
    let state = RenderState::new();
    state.begin_frame(1, Vec::new());
    state.mark_aborted("license lost");
    assert_eq!(
        state.wait_frame(1, POLL, || false),
        WaitOutcome::Aborted("license lost".into())
    );

    state.begin_frame(2, Vec::new());
    state.request_shutdown();
    assert!(matches!(state.wait_frame(2, POLL, || false), WaitOutcome::Aborted(_)));
    assert!(state.is_shutdown());
}

#[test]
fn lost_renderer_only_aborts_running_frames() {
    let state = RenderState::new();
    state.mark_lost("gone");
    state.begin_frame(1, Vec::new());
    state.mark_ready(1);
    state.mark_lost("gone");
    assert_eq!(state.wait_frame(1, POLL, || true), WaitOutcome::Ready);
}

#[test]
fn results_and_dirty_flag_are_taken_once() {
    let state = RenderState::new();
    let r = RenderResult::new("RenderLayer", Resolution::new(2, 2).unwrap(), &[PassType::Combined]);
    state.begin_frame(1, vec![r]);
    state.mark_updated();
    assert!(state.take_dirty());
    assert!(!state.take_dirty());
    assert_eq!(state.with_results(|rs| rs.len()), 1);
    assert_eq!(state.take_results().len(), 1);
    assert!(state.take_results().is_empty());
}

#[test]
fn progress_is_shared_through_the_state() {
    let state = RenderState::new();
    state.reset_progress(2);
    assert_eq!(state.progress(|t| t.frame_progress(0.5)), 0.25);
    assert_eq!(state.progress(|t| t.frame_done()), 0.5);
    assert_eq!(state.progress(|t| t.finish()), 1.0);
}
