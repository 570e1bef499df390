use std::f32::consts::PI;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use shader_backdrop::gl::{CallLog, FailurePoint, GlCall, HeadlessContext, HeadlessSurface};
use shader_backdrop::host::{
    ContainerRect, HeadlessCanvas, HostController, HostState, SessionRegistry, Transcript,
    TranscriptEntry, TranscriptPort,
};
use shader_backdrop::{
    EffectKind, HostError, HostMessage, PipelineConfig, PropSet, SurfaceSize, WorkerMessage,
    WorkerThread,
};

static LOGGER: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

type Controller = HostController<HeadlessCanvas, TranscriptPort<WorkerThread<HeadlessSurface>>>;

struct Harness {
    controller: Controller,
    replies: Receiver<WorkerMessage>,
    transcript: Transcript,
    log: CallLog,
}

fn mount(effect: EffectKind, props: &PropSet, surface: HeadlessSurface) -> Harness {
    Lazy::force(&LOGGER);
    let log = surface.log().clone();
    let transcript = Transcript::new();
    let mut replies = None;
    let controller = HostController::mount(
        effect,
        props,
        PipelineConfig::default(),
        HeadlessCanvas::new(surface),
        || {
            let (worker, inbox) =
                WorkerThread::spawn::<HeadlessContext>(effect, PipelineConfig::default())?;
            replies = Some(inbox);
            Ok(TranscriptPort::new(worker, transcript.clone()))
        },
    );
    Harness {
        controller,
        replies: replies.expect("worker spawned"),
        transcript,
        log,
    }
}

impl Harness {
    fn deliver_reply(&mut self) -> WorkerMessage {
        let reply = self
            .replies
            .recv_timeout(Duration::from_secs(5))
            .expect("worker replied");
        self.controller.handle_worker_message(reply.clone());
        reply
    }

    fn wait_for_draws(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.log.draw_count() < count {
            assert!(Instant::now() < deadline, "worker never drew {count} frames");
            thread::sleep(Duration::from_millis(2));
        }
    }
}

#[test]
fn orb_widget_lifecycle_end_to_end() {
    let props = PropSet::new().with("hue", 0.0).with("hoverIntensity", 0.2);
    let mut harness = mount(
        EffectKind::Orb,
        &props,
        HeadlessSurface::new(300, 150).with_log(CallLog::new()),
    );
    assert_eq!(harness.controller.state(), HostState::AwaitingReady);
    assert!(harness.controller.surface().is_transferred());
    assert_eq!(
        harness.transcript.messages(),
        vec![HostMessage::Init { canvas: () }]
    );

    harness
        .controller
        .resize(ContainerRect::new(0.0, 0.0, 300.0, 150.0), 2.0);
    assert_eq!(harness.deliver_reply(), WorkerMessage::Ready);
    assert_eq!(harness.controller.state(), HostState::Ready);

    let messages = harness.transcript.messages();
    assert_eq!(messages.len(), 4);
    match &messages[1] {
        HostMessage::Props(sent) => {
            assert_eq!(sent.number("hue"), Some(0.0));
            assert_eq!(sent.number("hoverIntensity"), Some(0.2));
            assert_eq!(sent.flag("rotateOnHover"), Some(true));
        }
        other => panic!("expected full props after ready, got {other:?}"),
    }
    assert_eq!(messages[2], HostMessage::Resize(SurfaceSize::new(600, 300)));
    assert_eq!(messages[3], HostMessage::Start);
    harness.wait_for_draws(2);

    harness.controller.set_props(&PropSet::new().with("hue", 180.0));
    harness.controller.set_props(&PropSet::new().with("hue", 180.0));
    let messages = harness.transcript.messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(
        messages[4],
        HostMessage::Props(PropSet::new().with("hue", 180.0))
    );

    let errors = harness.controller.unmount();
    assert!(errors.is_empty(), "teardown failed: {errors:?}");
    assert_eq!(harness.controller.state(), HostState::Unmounted);
    assert!(!harness.controller.surface().is_attached());

    let entries = harness.transcript.entries();
    let tail = &entries[entries.len() - 2..];
    assert_eq!(
        tail,
        &[
            TranscriptEntry::Posted(HostMessage::Cleanup),
            TranscriptEntry::Terminated,
        ]
    );

    let calls = harness.log.snapshot();
    assert!(calls.contains(&GlCall::ResizeSurface(SurfaceSize::new(600, 300))));
    assert!(calls.iter().any(|call| matches!(call, GlCall::DeleteProgram(_))));
    let hue = harness.log.last_uniform("hue").and_then(|value| value.as_float());
    assert!((hue.expect("hue written") - PI).abs() < 1e-5);

    let drawn = harness.log.draw_count();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(harness.log.draw_count(), drawn, "frames after teardown");
}

#[test]
fn init_failure_leaves_the_widget_failed() {
    let surface = HeadlessSurface::new(64, 64).failing_at(FailurePoint::Link);
    let mut harness = mount(EffectKind::Threads, &PropSet::new(), surface);
    match harness.deliver_reply() {
        WorkerMessage::Error { message } => assert!(message.contains("link")),
        other => panic!("expected an error reply, got {other:?}"),
    }
    assert_eq!(harness.controller.state(), HostState::Failed);

    harness
        .controller
        .resize(ContainerRect::new(0.0, 0.0, 10.0, 10.0), 1.0);
    harness.controller.set_props(&PropSet::new().with("amplitude", 2.0));
    assert_eq!(harness.transcript.messages().len(), 1);
    assert_eq!(harness.log.draw_count(), 0);

    assert!(harness.controller.unmount().is_empty());
    assert!(harness
        .transcript
        .entries()
        .ends_with(&[TranscriptEntry::Terminated]));
}

#[test]
fn hidden_widget_does_not_draw_until_visible() {
    let mut harness = mount(
        EffectKind::Aurora,
        &PropSet::new(),
        HeadlessSurface::new(32, 32),
    );
    harness.controller.set_visible(false);
    harness.deliver_reply();
    let messages = harness.transcript.messages();
    assert_eq!(
        &messages[messages.len() - 2..],
        &[HostMessage::Visibility { visible: false }, HostMessage::Start]
    );
    thread::sleep(Duration::from_millis(60));
    assert_eq!(harness.log.draw_count(), 0);

    harness.controller.set_visible(true);
    harness.wait_for_draws(1);
    harness.controller.unmount();
}

#[test]
fn registry_blocks_a_second_session_until_teardown() {
    Lazy::force(&LOGGER);
    let registry = SessionRegistry::new();
    let lease = registry.acquire("hero").expect("first session");
    assert!(matches!(
        registry.acquire("hero"),
        Err(HostError::SessionBusy(id)) if id == "hero"
    ));

    let mut harness = mount(
        EffectKind::Iridescence,
        &PropSet::new(),
        HeadlessSurface::new(16, 16),
    );
    harness.controller.attach_lease(lease);
    harness.deliver_reply();
    assert!(registry.is_active("hero"));

    harness.controller.unmount();
    assert!(!registry.is_active("hero"));
    assert!(registry.acquire("hero").is_ok());
}
