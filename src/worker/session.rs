use std::collections::HashMap;

use log::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::effects::{ShaderEffect, TickContext};
use crate::error::GlError;
use crate::gl::{
    AttributeLayout, ContextAttributes, GraphicsContext, ShaderStage, FULLSCREEN_TRIANGLE,
    FULLSCREEN_VERTEX_COUNT,
};
use crate::props::{PropPatch, PropSet};
use crate::protocol::{HostMessage, SurfaceSize, WorkerMessage};
use crate::uniforms::{UniformState, UniformValue};

use super::{AnimationClock, DampedPointer};

const POSITION_LAYOUT: AttributeLayout = AttributeLayout {
    components: 2,
    stride: 4,
    offset: 0,
};

const UV_LAYOUT: AttributeLayout = AttributeLayout {
    components: 2,
    stride: 4,
    offset: 2,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// Binding the context and building the program.
    ReadyWait,
    Idle,
    Running,
    Terminated,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated | Self::Failed)
    }
}

/// What the driver must do after a message was handled.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Dispatch {
    pub reply: Option<WorkerMessage>,
    /// Schedule one frame callback that ends in [`RenderSession::tick`].
    pub request_frame: bool,
}

impl Dispatch {
    fn reply(message: WorkerMessage) -> Self {
        Self {
            reply: Some(message),
            request_frame: false,
        }
    }

    fn frame() -> Self {
        Self {
            reply: None,
            request_frame: true,
        }
    }
}

struct GlResources<G: GraphicsContext> {
    gl: G,
    program: G::Program,
    buffer: G::Buffer,
    locations: HashMap<&'static str, G::UniformLocation>,
}

impl<G: GraphicsContext> GlResources<G> {
    fn write(&mut self, uniform: &str, value: &UniformValue) {
        if let Some(location) = self.locations.get(uniform) {
            self.gl.set_uniform(location, value);
        }
    }
}

/// One render worker session: the GL resources, uniform state, clock and
/// pointer of a single widget.
///
/// The session is driven by a runtime that feeds it host messages and
/// frame callbacks. It tracks whether a frame callback is outstanding, so
/// the runtime never has more than one scheduled at a time.
pub struct RenderSession<G: GraphicsContext> {
    effect: Box<dyn ShaderEffect>,
    state: SessionState,
    resources: Option<GlResources<G>>,
    props: PropSet,
    uniforms: UniformState,
    clock: AnimationClock,
    pointer: DampedPointer,
    size: SurfaceSize,
    visible: bool,
    resume_when_visible: bool,
    frame_pending: bool,
}

impl<G: GraphicsContext> RenderSession<G> {
    pub fn new(effect: Box<dyn ShaderEffect>, config: &PipelineConfig) -> Self {
        let pointer_config = effect.pointer();
        let tau = config
            .pointer_smoothing
            .unwrap_or(pointer_config.smoothing);
        let props = effect.default_props();
        Self {
            effect,
            state: SessionState::Uninitialized,
            resources: None,
            props,
            uniforms: UniformState::new(),
            clock: AnimationClock::new(config),
            pointer: DampedPointer::new(pointer_config.rest, tau),
            size: SurfaceSize::new(1, 1),
            visible: true,
            resume_when_visible: false,
            frame_pending: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn props(&self) -> &PropSet {
        &self.props
    }

    pub fn uniforms(&self) -> &UniformState {
        &self.uniforms
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn pointer(&self) -> &DampedPointer {
        &self.pointer
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn handle(&mut self, message: HostMessage<G::Surface>) -> Dispatch {
        if self.state.is_terminal() {
            debug!(
                "{} session ignored `{}` after shutdown",
                self.effect.kind(),
                message.kind()
            );
            return Dispatch::default();
        }
        match message {
            HostMessage::Init { canvas } => self.init(canvas),
            HostMessage::Props(patch) => {
                self.apply_props(&patch);
                Dispatch::default()
            }
            HostMessage::Resize(size) => {
                self.resize(size);
                Dispatch::default()
            }
            HostMessage::Start => self.start(),
            HostMessage::Stop => {
                self.resume_when_visible = false;
                self.pause();
                Dispatch::default()
            }
            HostMessage::Mouse(position) => {
                self.pointer.set_target(position.into());
                Dispatch::default()
            }
            HostMessage::MouseLeave => {
                self.pointer.leave(self.effect.pointer().on_leave);
                Dispatch::default()
            }
            HostMessage::Visibility { visible } => self.set_visible(visible),
            HostMessage::Cleanup => {
                self.cleanup();
                Dispatch::default()
            }
        }
    }

    /// Runs one animation frame at `now` seconds. Returns `true` when the
    /// runtime must schedule another frame callback.
    pub fn tick(&mut self, now: f64) -> bool {
        self.frame_pending = false;
        if self.state != SessionState::Running {
            return false;
        }
        let Some(delta) = self.clock.advance(now) else {
            return false;
        };
        let damped = self.pointer.step(delta);
        let elapsed = self.clock.elapsed();

        let mut frame = TickContext::new(
            delta,
            elapsed,
            self.size,
            self.pointer.target(),
            damped,
            self.pointer.is_inside(),
            &self.props,
        );
        self.effect.on_tick(&mut frame);
        let updates = frame.into_updates();

        let names = self.effect.frame_uniforms();
        let time = self.effect.time_value(elapsed, &self.props);
        self.write_uniform(names.time, UniformValue::Float(time));
        if let Some(pointer) = names.pointer {
            self.write_uniform(pointer, UniformValue::Vec2(damped));
        }
        for (uniform, value) in updates {
            self.write_uniform(uniform, value);
        }

        if let Some(resources) = self.resources.as_mut() {
            resources.gl.draw_triangles(FULLSCREEN_VERTEX_COUNT);
        }
        self.frame_pending = true;
        true
    }

    fn init(&mut self, surface: G::Surface) -> Dispatch {
        if self.state != SessionState::Uninitialized {
            warn!("{} session received a second `init`", self.effect.kind());
            return Dispatch::default();
        }
        self.state = SessionState::ReadyWait;
        match self.build_resources(surface) {
            Ok(resources) => {
                self.size = resources.gl.surface_size();
                self.resources = Some(resources);
                self.state = SessionState::Idle;
                self.apply_initial_uniforms();
                info!(
                    "{} session ready at {}x{}",
                    self.effect.kind(),
                    self.size.width,
                    self.size.height
                );
                Dispatch::reply(WorkerMessage::Ready)
            }
            Err(err) => {
                error!("{} session failed to initialize: {err}", self.effect.kind());
                self.state = SessionState::Failed;
                Dispatch::reply(WorkerMessage::Error {
                    message: err.to_string(),
                })
            }
        }
    }

    fn build_resources(&self, surface: G::Surface) -> Result<GlResources<G>, GlError> {
        let mut gl = G::bind(surface, &ContextAttributes::background())?;
        let vertex = gl.compile_shader(ShaderStage::Vertex, self.effect.vertex_source())?;
        let fragment = match gl.compile_shader(ShaderStage::Fragment, self.effect.fragment_source()) {
            Ok(fragment) => fragment,
            Err(err) => {
                gl.delete_shader(vertex);
                return Err(err);
            }
        };
        let linked = gl.link_program(&vertex, &fragment);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);
        let program = linked?;
        gl.use_program(&program);

        let buffer = match gl.create_vertex_buffer(bytemuck::cast_slice(&FULLSCREEN_TRIANGLE)) {
            Ok(buffer) => buffer,
            Err(err) => {
                gl.delete_program(program);
                return Err(err);
            }
        };
        for (name, layout) in [("position", POSITION_LAYOUT), ("uv", UV_LAYOUT)] {
            if !gl.bind_attribute(&program, name, layout) {
                debug!("{} program does not read `{name}`", self.effect.kind());
            }
        }

        let mut locations = HashMap::new();
        for uniform in self.uniform_names() {
            match gl.uniform_location(&program, uniform) {
                Some(location) => {
                    locations.insert(uniform, location);
                }
                None => debug!("{} program has no uniform `{uniform}`", self.effect.kind()),
            }
        }

        Ok(GlResources {
            gl,
            program,
            buffer,
            locations,
        })
    }

    fn uniform_names(&self) -> Vec<&'static str> {
        let frame = self.effect.frame_uniforms();
        let mut names: Vec<&'static str> = self
            .effect
            .bindings()
            .iter()
            .map(|binding| binding.uniform)
            .collect();
        names.push(frame.time);
        names.extend(frame.resolution.map(|(name, _)| name));
        names.extend(frame.pointer);
        names.extend(self.effect.tick_uniforms());
        names
    }

    fn apply_initial_uniforms(&mut self) {
        let everything = self.props.clone();
        self.push_bindings(&everything);
        self.push_resolution();
        let frame = self.effect.frame_uniforms();
        let time = self.effect.time_value(self.clock.elapsed(), &self.props);
        self.write_uniform(frame.time, UniformValue::Float(time));
        if let Some(pointer) = frame.pointer {
            self.write_uniform(pointer, UniformValue::Vec2(self.pointer.value()));
        }
    }

    fn apply_props(&mut self, patch: &PropPatch) {
        self.props.merge(patch);
        if self.resources.is_some() {
            self.push_bindings(patch);
        }
    }

    /// Pushes every binding that reads a prop in `changed`.
    fn push_bindings(&mut self, changed: &PropSet) {
        for binding in self.effect.bindings() {
            if !changed.keys().any(|name| binding.depends_on(name)) {
                continue;
            }
            match binding.resolve(&self.props) {
                Ok(Some(value)) => self.write_uniform(binding.uniform, value),
                Ok(None) => {}
                Err(err) => warn!("{}: {err}", self.effect.kind()),
            }
        }
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        let Some(resources) = self.resources.as_mut() else {
            return;
        };
        resources.gl.resize_surface(size);
        resources.gl.viewport(size);
        self.push_resolution();
    }

    fn push_resolution(&mut self) {
        if let Some((uniform, layout)) = self.effect.frame_uniforms().resolution {
            self.write_uniform(uniform, layout.value(self.size));
        }
    }

    fn start(&mut self) -> Dispatch {
        match self.state {
            SessionState::Idle if !self.visible => {
                self.resume_when_visible = true;
                Dispatch::default()
            }
            SessionState::Idle => {
                self.clock.start();
                self.state = SessionState::Running;
                self.schedule()
            }
            SessionState::Running => Dispatch::default(),
            state => {
                debug!("{} session cannot start from {state:?}", self.effect.kind());
                Dispatch::default()
            }
        }
    }

    fn pause(&mut self) {
        if self.state == SessionState::Running {
            self.clock.stop();
            self.state = SessionState::Idle;
        }
    }

    fn set_visible(&mut self, visible: bool) -> Dispatch {
        self.visible = visible;
        if !visible {
            if self.state == SessionState::Running {
                self.resume_when_visible = true;
                self.pause();
            }
            return Dispatch::default();
        }
        if std::mem::take(&mut self.resume_when_visible) {
            return self.start();
        }
        Dispatch::default()
    }

    fn schedule(&mut self) -> Dispatch {
        if self.frame_pending {
            return Dispatch::default();
        }
        self.frame_pending = true;
        Dispatch::frame()
    }

    fn cleanup(&mut self) {
        self.clock.stop();
        self.resume_when_visible = false;
        if let Some(mut resources) = self.resources.take() {
            resources.locations.clear();
            resources.gl.delete_buffer(resources.buffer);
            resources.gl.delete_program(resources.program);
        }
        self.state = SessionState::Terminated;
        info!("{} session released its resources", self.effect.kind());
    }

    fn write_uniform(&mut self, uniform: &'static str, value: UniformValue) {
        if !self.uniforms.set(uniform, value.clone()) {
            return;
        }
        if let Some(resources) = self.resources.as_mut() {
            resources.write(uniform, &value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectKind, Iridescence};
    use crate::gl::{CallLog, FailurePoint, GlCall, HeadlessContext, HeadlessSurface};
    use crate::protocol::PointerPosition;
    use glam::Vec2;

    type Session = RenderSession<HeadlessContext>;

    fn session(kind: EffectKind) -> Session {
        RenderSession::new(kind.build(), &PipelineConfig::default())
    }

    fn ready(kind: EffectKind) -> (Session, CallLog) {
        let log = CallLog::new();
        let mut session = session(kind);
        let surface = HeadlessSurface::new(320, 200).with_log(log.clone());
        let dispatch = session.handle(HostMessage::Init { canvas: surface });
        assert_eq!(dispatch.reply, Some(WorkerMessage::Ready));
        (session, log)
    }

    #[test]
    fn init_builds_program_and_announces_ready() {
        for kind in EffectKind::all() {
            let (session, log) = ready(*kind);
            assert_eq!(session.state(), SessionState::Idle);
            assert_eq!(session.size(), SurfaceSize::new(320, 200));
            assert_eq!(
                log.count(|call| matches!(call, GlCall::CreateBuffer { bytes: 48, .. })),
                1
            );
            assert_eq!(log.count(|call| matches!(call, GlCall::BindAttribute { .. })), 2);
            assert_eq!(log.count(|call| matches!(call, GlCall::DeleteShader(_))), 2);
            assert_eq!(log.draw_count(), 0);
        }
    }

    #[test]
    fn context_attributes_skip_depth_and_stencil() {
        let (_, log) = ready(EffectKind::Aurora);
        let Some(GlCall::CreateContext(attributes)) = log.snapshot().first().cloned() else {
            panic!("context was not created first");
        };
        assert_eq!(attributes, ContextAttributes::background());
        assert!(attributes.high_performance);
        assert!(!attributes.depth && !attributes.stencil && !attributes.preserve_drawing_buffer);
    }

    #[test]
    fn compile_failure_never_reports_ready() {
        for failure in [
            FailurePoint::Context,
            FailurePoint::Compile(ShaderStage::Vertex),
            FailurePoint::Compile(ShaderStage::Fragment),
            FailurePoint::Link,
        ] {
            let log = CallLog::new();
            let mut session = session(EffectKind::Orb);
            let surface = HeadlessSurface::new(64, 64)
                .with_log(log.clone())
                .failing_at(failure);
            let dispatch = session.handle(HostMessage::Init { canvas: surface });
            assert!(matches!(dispatch.reply, Some(WorkerMessage::Error { .. })));
            assert_eq!(session.state(), SessionState::Failed);

            let dispatch = session.handle(HostMessage::Start);
            assert_eq!(dispatch, Dispatch::default());
            assert!(!session.tick(1.0));
            assert_eq!(log.draw_count(), 0);
        }
    }

    #[test]
    fn resize_before_props_is_applied_in_order() {
        let (mut session, log) = ready(EffectKind::Orb);
        log.clear();
        session.handle(HostMessage::Resize(SurfaceSize::new(100, 50)));
        session.handle(HostMessage::Props(PropSet::new().with("hue", 90.0)));

        let viewport = log
            .position(|call| *call == GlCall::Viewport(SurfaceSize::new(100, 50)))
            .unwrap();
        let hue = log
            .position(|call| matches!(call, GlCall::SetUniform { name, .. } if name == "hue"))
            .unwrap();
        assert!(viewport < hue);
        assert_eq!(
            log.last_uniform("iResolution"),
            Some(UniformValue::Vec3(glam::Vec3::new(100.0, 50.0, 2.0)))
        );
        let hue = log.last_uniform("hue").and_then(|v| v.as_float()).unwrap();
        assert!((hue - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn props_apply_while_idle_and_merge() {
        let (mut session, log) = ready(EffectKind::Iridescence);
        log.clear();
        session.handle(HostMessage::Props(PropSet::new().with("amplitude", 0.4)));
        assert_eq!(log.last_uniform("uAmplitude"), Some(UniformValue::Float(0.4)));
        assert_eq!(log.last_uniform("uSpeed"), None);
        assert_eq!(session.props().number("speed"), Some(1.0));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn props_before_init_are_applied_at_init() {
        let log = CallLog::new();
        let mut session = session(EffectKind::Orb);
        session.handle(HostMessage::Props(PropSet::new().with("hoverIntensity", 0.7)));
        session.handle(HostMessage::Init {
            canvas: HeadlessSurface::new(10, 10).with_log(log.clone()),
        });
        assert_eq!(log.last_uniform("hoverIntensity"), Some(UniformValue::Float(0.7)));
    }

    #[test]
    fn start_is_idempotent() {
        let (mut session, log) = ready(EffectKind::Threads);
        assert!(session.handle(HostMessage::Start).request_frame);
        assert!(!session.handle(HostMessage::Start).request_frame);
        assert!(session.frame_pending());

        assert!(session.tick(0.0));
        assert!(!session.handle(HostMessage::Start).request_frame);
        assert!(session.tick(0.016));
        assert_eq!(log.draw_count(), 2);
    }

    #[test]
    fn stop_leaves_no_scheduled_work() {
        let (mut session, log) = ready(EffectKind::Aurora);
        session.handle(HostMessage::Start);
        assert!(session.tick(0.0));
        session.handle(HostMessage::Stop);
        assert_eq!(session.state(), SessionState::Idle);
        // The callback already queued fires once and does not reschedule.
        assert!(!session.tick(0.016));
        assert!(!session.frame_pending());
        assert_eq!(log.draw_count(), 1);

        // Restarting while the stale callback is still queued reuses it.
        let (mut session, _) = ready(EffectKind::Aurora);
        session.handle(HostMessage::Start);
        session.handle(HostMessage::Stop);
        assert!(!session.handle(HostMessage::Start).request_frame);
        assert!(session.tick(1.0));
    }

    #[test]
    fn restart_after_long_stop_applies_one_nominal_frame() {
        let (mut session, log) = ready(EffectKind::Aurora);
        session.handle(HostMessage::Start);
        session.tick(0.0);
        session.tick(0.5);
        let before = session.clock().elapsed();
        session.handle(HostMessage::Stop);
        session.tick(0.51);
        session.handle(HostMessage::Start);
        session.tick(10.5);
        let applied = session.clock().elapsed() - before;
        assert!(applied <= 1.0 / 60.0 + 1e-6);
        let time = log.last_uniform("uTime").and_then(|v| v.as_float()).unwrap();
        assert!((time - session.clock().elapsed()).abs() < 1e-6);
    }

    #[test]
    fn pointer_is_damped_toward_target() {
        let (mut session, log) = ready(EffectKind::Iridescence);
        let tau = Iridescence.pointer().smoothing;
        session.handle(HostMessage::Start);
        session.handle(HostMessage::Mouse(PointerPosition { x: 1.0, y: 0.0 }));
        let mut now = 0.0;
        let ticks = ((tau / (1.0 / 60.0)) * 100f32.ln()).ceil() as usize + 1;
        for _ in 0..ticks {
            session.tick(now);
            now += 1.0 / 60.0;
        }
        let mouse = log.last_uniform("uMouse").and_then(|v| v.as_vec2()).unwrap();
        assert!((mouse - Vec2::new(1.0, 0.0)).length() < 0.01 * Vec2::new(1.0, 0.0).length() + 0.005);
    }

    #[test]
    fn mouse_leave_resets_when_configured() {
        let (mut session, _) = ready(EffectKind::Threads);
        session.handle(HostMessage::Mouse(PointerPosition { x: 0.9, y: 0.9 }));
        session.handle(HostMessage::MouseLeave);
        assert_eq!(session.pointer().target(), Vec2::splat(0.5));

        let (mut session, _) = ready(EffectKind::Iridescence);
        session.handle(HostMessage::Mouse(PointerPosition { x: 0.9, y: 0.9 }));
        session.handle(HostMessage::MouseLeave);
        assert_eq!(session.pointer().target(), Vec2::splat(0.9));
    }

    #[test]
    fn visibility_pauses_and_resumes_running_loop() {
        let (mut session, _) = ready(EffectKind::Orb);
        session.handle(HostMessage::Start);
        session.tick(0.0);
        session.handle(HostMessage::Visibility { visible: false });
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.clock().is_running());
        assert!(!session.tick(0.1));

        let dispatch = session.handle(HostMessage::Visibility { visible: true });
        assert!(dispatch.request_frame);
        assert_eq!(session.state(), SessionState::Running);
        assert!(session.clock().is_running());

        // A session that was stopped stays stopped.
        session.handle(HostMessage::Stop);
        session.handle(HostMessage::Visibility { visible: false });
        let dispatch = session.handle(HostMessage::Visibility { visible: true });
        assert!(!dispatch.request_frame);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_while_hidden_waits_for_visibility() {
        let (mut session, _) = ready(EffectKind::Threads);
        session.handle(HostMessage::Visibility { visible: false });
        assert!(!session.handle(HostMessage::Start).request_frame);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.handle(HostMessage::Visibility { visible: true }).request_frame);
    }

    #[test]
    fn orb_tick_writes_hover_and_rotation() {
        let (mut session, log) = ready(EffectKind::Orb);
        session.handle(HostMessage::Props(PropSet::new().with("forceHoverState", true)));
        session.handle(HostMessage::Start);
        for frame in 0..30 {
            session.tick(frame as f64 / 60.0);
        }
        assert!(log.last_uniform("hover").and_then(|v| v.as_float()).unwrap() > 0.5);
        assert!(log.last_uniform("rot").and_then(|v| v.as_float()).unwrap() > 0.0);
    }

    #[test]
    fn cleanup_is_idempotent_in_every_state() {
        // Before init.
        let mut session = session(EffectKind::LightPillar);
        session.handle(HostMessage::Cleanup);
        session.handle(HostMessage::Cleanup);
        assert_eq!(session.state(), SessionState::Terminated);

        // After init, twice.
        let (mut session, log) = ready(EffectKind::LightPillar);
        session.handle(HostMessage::Start);
        session.tick(0.0);
        session.handle(HostMessage::Cleanup);
        session.handle(HostMessage::Cleanup);
        assert_eq!(log.count(|call| matches!(call, GlCall::DeleteBuffer(_))), 1);
        assert_eq!(log.count(|call| matches!(call, GlCall::DeleteProgram(_))), 1);
        assert!(!session.tick(0.016));

        // After a failed init nothing is deleted.
        let log = CallLog::new();
        let mut session = RenderSession::<HeadlessContext>::new(
            EffectKind::Aurora.build(),
            &PipelineConfig::default(),
        );
        session.handle(HostMessage::Init {
            canvas: HeadlessSurface::new(4, 4)
                .with_log(log.clone())
                .failing_at(FailurePoint::Link),
        });
        session.handle(HostMessage::Cleanup);
        assert_eq!(log.count(|call| matches!(call, GlCall::DeleteProgram(_))), 0);
        assert_eq!(log.count(|call| matches!(call, GlCall::DeleteBuffer(_))), 0);
    }

    #[test]
    fn channel_props_compose_the_iridescence_color() {
        let (mut session, log) = ready(EffectKind::Iridescence);
        assert_eq!(
            log.last_uniform("uColor").and_then(|v| v.as_vec3()),
            Some(glam::Vec3::ONE)
        );
        session.handle(HostMessage::Props(
            PropSet::new()
                .with("red", 1.0)
                .with("green", 0.0)
                .with("blue", 0.0)
                .with("speed", 2.0)
                .with("amplitude", 0.3),
        ));
        assert_eq!(
            log.last_uniform("uColor").and_then(|v| v.as_vec3()),
            Some(glam::Vec3::new(1.0, 0.0, 0.0))
        );
        assert_eq!(log.last_uniform("uSpeed").and_then(|v| v.as_float()), Some(2.0));

        session.handle(HostMessage::Props(PropSet::new().with("color", "#0000ff")));
        assert_eq!(
            log.last_uniform("uColor").and_then(|v| v.as_vec3()),
            Some(glam::Vec3::new(0.0, 0.0, 1.0))
        );
    }

    #[test]
    fn messages_after_cleanup_are_ignored() {
        let (mut session, log) = ready(EffectKind::Threads);
        session.handle(HostMessage::Cleanup);
        let calls = log.len();
        session.handle(HostMessage::Resize(SurfaceSize::new(50, 50)));
        session.handle(HostMessage::Props(PropSet::new().with("amplitude", 2.0)));
        assert_eq!(session.handle(HostMessage::Start), Dispatch::default());
        assert_eq!(log.len(), calls);
    }

    #[test]
    fn configured_smoothing_overrides_effect() {
        let config = PipelineConfig {
            pointer_smoothing: Some(0.0001),
            ..PipelineConfig::default()
        };
        let mut session =
            RenderSession::<HeadlessContext>::new(EffectKind::Threads.build(), &config);
        session.handle(HostMessage::Init {
            canvas: HeadlessSurface::new(8, 8),
        });
        session.handle(HostMessage::Start);
        session.handle(HostMessage::Mouse(PointerPosition { x: 1.0, y: 1.0 }));
        session.tick(0.0);
        assert!((session.pointer().value() - Vec2::ONE).length() < 1e-3);
    }
}
