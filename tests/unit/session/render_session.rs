use super::*;
use crate::host::binding::HostHandles;
use crate::host::memory::{MemoryScene, RecordingEngine, SceneDef};
use crate::renderer::sim::{SimOptions, SimRuntime};

struct Fixture {
    engine: Arc<RecordingEngine>,
    binding: HostBinding,
    runtime: SimRuntime,
}

fn fixture(opts: SimOptions) -> Fixture {
    let engine = Arc::new(RecordingEngine::new());
    let scene = Arc::new(MemoryScene::new(SceneDef::new("s")).unwrap());
    let (binding, _) = HostBinding::from_handles(HostHandles {
        engine: Some(engine.clone()),
        scene: Some(scene),
        ..HostHandles::default()
    })
    .unwrap();
    let runtime = SimRuntime::new(opts);
    runtime.initialize().unwrap();
    Fixture {
        engine,
        binding,
        runtime,
    }
}

fn open(f: &Fixture, interactive: bool) -> RenderSession {
    RenderSession::open(
        &f.runtime,
        &f.binding,
        &LiveTarget {
            show_frame_buffer: true,
            interactive,
        },
        Resolution::new(4, 4).unwrap(),
        Duration::from_millis(5),
    )
    .unwrap()
}

#[test]
fn frame_round_trip_pushes_final_pixels() {
    let f = fixture(SimOptions {
        steps: 3,
        step_delay: Duration::from_millis(20),
        ..SimOptions::default()
    });
    let mut session = open(&f, true);
    let mut host = f.binding.context.enter();

    session.reset_progress(1);
    session
        .start_frame(&host, 5, &["RenderLayer".to_string()])
        .unwrap();
    assert_eq!(session.wait_frame(&mut host, 5), WaitOutcome::Ready);
    session.finish_frame(&host, false);
    assert_eq!(session.finish_progress(), 1.0);

    let log = f.engine.log();
    assert_eq!(log.results_begun, 1);
    assert_eq!(log.results_ended.len(), 1);
    let (result, cancel) = &log.results_ended[0];
    assert!(!cancel);
    assert_eq!(result.combined().map(|i| i.progress), Some(1.0));
    assert!(log.result_updates >= 1);
    assert!(log.progress.windows(2).all(|w| w[0] <= w[1]));

    let probe = f.runtime.last_renderer().unwrap();
    assert_eq!(probe.rendered_frames(), vec![5]);
    assert!(probe.frame_buffer_shown());

    drop(host);
    session.release();
    session.release();
    assert!(session.is_released());
    assert!(probe.is_shut_down());
    assert!(session.exporter().is_err());
}

#[test]
fn non_interactive_sessions_skip_partial_pushes() {
    let f = fixture(SimOptions {
        steps: 3,
        step_delay: Duration::from_millis(20),
        ..SimOptions::default()
    });
    let session = open(&f, false);
    let mut host = f.binding.context.enter();
    session.start_frame(&host, 1, &["RenderLayer".to_string()]).unwrap();
    assert_eq!(session.wait_frame(&mut host, 1), WaitOutcome::Ready);
    session.finish_frame(&host, false);
    let log = f.engine.log();
    assert_eq!(log.result_updates, 0);
    assert!(!log.progress.is_empty());
    assert!(log.results_ended[0].0.combined().is_some());
}

#[test]
fn interrupted_wait_cancels_results() {
    let f = fixture(SimOptions {
        steps: 100,
        step_delay: Duration::from_millis(10),
        ..SimOptions::default()
    });
    let session = open(&f, true);
    let mut host = f.binding.context.enter();
    session.start_frame(&host, 1, &["RenderLayer".to_string()]).unwrap();
    f.engine.request_break();
    assert_eq!(session.wait_frame(&mut host, 1), WaitOutcome::Interrupted);
    session.stop(&host);
    assert!(!session.is_rendering());
    let log = f.engine.log();
    assert_eq!(log.results_ended.len(), 1);
    assert!(log.results_ended[0].1);
}

#[test]
fn renderer_abort_reaches_the_wait() {
    let f = fixture(SimOptions {
        abort_at_frame: Some(3),
        ..SimOptions::default()
    });
    let session = open(&f, true);
    let mut host = f.binding.context.enter();
    session.start_frame(&host, 3, &[]).unwrap();
    assert!(matches!(
        session.wait_frame(&mut host, 3),
        WaitOutcome::Aborted(reason) if reason.contains("frame 3")
    ));
}

#[test]
fn release_while_the_host_is_held_does_not_deadlock() {
    let f = fixture(SimOptions {
        steps: 20,
        step_delay: Duration::from_millis(5),
        ..SimOptions::default()
    });
    let session = open(&f, true);
    let host = f.binding.context.enter();
    session.start_frame(&host, 1, &["RenderLayer".to_string()]).unwrap();
    drop(session);
    drop(host);
    assert!(f.runtime.last_renderer().unwrap().is_shut_down());
}

#[test]
fn unreachable_renderer_is_an_init_error() {
    let f = fixture(SimOptions::default());
    let cold = SimRuntime::default();
    let err = RenderSession::open(
        &cold,
        &f.binding,
        &LiveTarget::default(),
        Resolution::default(),
        Duration::from_millis(5),
    )
    .unwrap_err();
    assert!(matches!(err, SceneportError::Init(_)));
}
