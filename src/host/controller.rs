use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::config::PipelineConfig;
use crate::effects::{EffectKind, PointerConfig};
use crate::error::HostError;
use crate::props::{PropPatch, PropSet};
use crate::protocol::{HostMessage, SurfaceSize, WorkerMessage};

use super::geometry::{normalize_pointer, surface_size, ContainerRect};

/// The canvas element a widget draws into.
pub trait HostSurface {
    /// Handle produced by handing control to a worker.
    type Transfer;

    fn supports_offscreen(&self) -> bool;

    /// One-shot handoff of the drawing buffer.
    fn transfer_control(&mut self) -> Result<Self::Transfer, HostError>;

    /// Detaches the element. Must tolerate an element that is already gone.
    fn remove(&mut self) -> Result<(), HostError>;
}

/// Sending half of the channel to a render worker.
pub trait WorkerPort {
    type Surface;

    fn post(&mut self, message: HostMessage<Self::Surface>) -> Result<(), HostError>;

    fn terminate(&mut self) -> Result<(), HostError>;
}

/// A listener or observer attached on behalf of a widget.
pub trait Subscription {
    fn name(&self) -> &'static str;

    fn detach(&mut self) -> Result<(), HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// No offscreen support; the canvas stays static and no worker exists.
    Degraded,
    AwaitingReady,
    Ready,
    /// The worker reported an initialization error or could not be reached.
    Failed,
    Unmounted,
}

/// Updates observed before the worker reported ready.
#[derive(Debug, Default)]
struct PendingUpdates {
    props: PropPatch,
    size: Option<SurfaceSize>,
    visible: Option<bool>,
}

/// Bridges one mounted widget to its render worker.
pub struct HostController<S: HostSurface, P: WorkerPort<Surface = S::Transfer>> {
    effect: EffectKind,
    pointer: PointerConfig,
    config: PipelineConfig,
    surface: S,
    port: Option<P>,
    state: HostState,
    props: PropSet,
    pending: PendingUpdates,
    sent_size: Option<SurfaceSize>,
    subscriptions: Vec<Box<dyn Subscription>>,
    lease: Option<SessionLease>,
}

impl<S, P> HostController<S, P>
where
    S: HostSurface,
    P: WorkerPort<Surface = S::Transfer>,
{
    /// Mounts a widget. `spawn` is only called when the surface supports
    /// offscreen rendering.
    pub fn mount(
        effect: EffectKind,
        props: &PropSet,
        config: PipelineConfig,
        surface: S,
        spawn: impl FnOnce() -> Result<P, HostError>,
    ) -> Self {
        let payload = effect.build();
        let mut current = payload.default_props();
        current.merge(props);
        let mut controller = Self {
            effect,
            pointer: payload.pointer(),
            config,
            surface,
            port: None,
            state: HostState::Degraded,
            props: current,
            pending: PendingUpdates::default(),
            sent_size: None,
            subscriptions: Vec::new(),
            lease: None,
        };

        if !controller.surface.supports_offscreen() {
            warn!("{effect}: offscreen canvas transfer is unsupported, rendering a static canvas");
            return controller;
        }
        let transfer = match controller.surface.transfer_control() {
            Ok(transfer) => transfer,
            Err(err) => {
                warn!("{effect}: {err}, rendering a static canvas");
                return controller;
            }
        };
        let mut port = match spawn() {
            Ok(port) => port,
            Err(err) => {
                error!("{effect}: {err}");
                controller.state = HostState::Failed;
                return controller;
            }
        };
        if let Err(err) = port.post(HostMessage::Init { canvas: transfer }) {
            error!("{effect}: {err}");
            controller.state = HostState::Failed;
        } else {
            controller.state = HostState::AwaitingReady;
        }
        controller.port = Some(port);
        info!("{effect}: widget mounted");
        controller
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn effect(&self) -> EffectKind {
        self.effect
    }

    pub fn props(&self) -> &PropSet {
        &self.props
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The worker channel, absent when degraded or unmounted.
    pub fn port(&self) -> Option<&P> {
        self.port.as_ref()
    }

    /// Whether pointer listeners should be attached for the current props.
    pub fn is_interactive(&self) -> bool {
        self.pointer.is_interactive(&self.props)
    }

    /// Ties the controller to a registry lease, released on unmount.
    pub fn attach_lease(&mut self, lease: SessionLease) {
        self.lease = Some(lease);
    }

    pub fn add_subscription(&mut self, subscription: Box<dyn Subscription>) {
        if self.state == HostState::Unmounted {
            let mut subscription = subscription;
            if let Err(err) = subscription.detach() {
                warn!("{}: {err}", self.effect);
            }
            return;
        }
        self.subscriptions.push(subscription);
    }

    /// Drops every subscription whose name matches, detaching it.
    pub fn remove_subscriptions(&mut self, name: &str) {
        let (matching, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.subscriptions)
            .into_iter()
            .partition(|subscription| subscription.name() == name);
        self.subscriptions = kept;
        for mut subscription in matching {
            if let Err(err) = subscription.detach() {
                warn!("{}: {err}", self.effect);
            }
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Handles a decoded worker message. Unknown kinds never reach here.
    pub fn handle_worker_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Ready => self.on_ready(),
            WorkerMessage::Error { message } => {
                error!("{}: render worker failed: {message}", self.effect);
                if self.state == HostState::AwaitingReady {
                    self.state = HostState::Failed;
                }
            }
        }
    }

    /// Decodes and handles a raw worker message, ignoring unknown kinds.
    pub fn handle_worker_json(&mut self, source: &str) {
        match WorkerMessage::from_json(source) {
            Ok(Some(message)) => self.handle_worker_message(message),
            Ok(None) => debug!("{}: ignoring worker message {source}", self.effect),
            Err(err) => warn!("{}: {err}", self.effect),
        }
    }

    fn on_ready(&mut self) {
        if self.state != HostState::AwaitingReady {
            debug!("{}: unexpected `ready` in {:?}", self.effect, self.state);
            return;
        }
        self.state = HostState::Ready;
        let queued = std::mem::take(&mut self.pending);
        if !queued.props.is_empty() {
            debug!(
                "{}: replaying {} prop(s) changed before ready",
                self.effect,
                queued.props.len()
            );
        }
        self.post(HostMessage::Props(self.props.clone()));
        let size = queued.size.unwrap_or_else(|| SurfaceSize::new(1, 1));
        self.sent_size = Some(size);
        self.post(HostMessage::Resize(size));
        if queued.visible == Some(false) {
            self.post(HostMessage::Visibility { visible: false });
        }
        self.post(HostMessage::Start);
        info!("{}: render worker ready", self.effect);
    }

    /// Applies the latest props. Only keys whose values changed are sent.
    /// Returns `true` when pointer interactivity flipped, so the caller can
    /// attach or detach pointer listeners.
    pub fn set_props(&mut self, next: &PropSet) -> bool {
        let was_interactive = self.is_interactive();
        let changed = self.props.diff(next);
        if changed.is_empty() {
            return false;
        }
        self.props.merge(&changed);
        match self.state {
            HostState::Ready => self.post(HostMessage::Props(changed)),
            HostState::AwaitingReady => self.pending.props.merge(&changed),
            _ => {}
        }
        was_interactive != self.is_interactive()
    }

    /// Recomputes the surface size for a container and pixel ratio.
    pub fn resize(&mut self, rect: ContainerRect, pixel_ratio: f32) {
        let size = surface_size(rect, pixel_ratio, &self.config);
        match self.state {
            HostState::Ready => {
                if self.sent_size == Some(size) {
                    return;
                }
                self.sent_size = Some(size);
                self.post(HostMessage::Resize(size));
            }
            HostState::AwaitingReady => self.pending.size = Some(size),
            _ => {}
        }
    }

    /// Forwards a pointer position given in viewport coordinates.
    pub fn pointer_move(&mut self, client: Vec2, rect: ContainerRect) {
        if self.state != HostState::Ready || !self.is_interactive() {
            return;
        }
        let position = normalize_pointer(client, rect, self.pointer.range);
        self.post(HostMessage::Mouse(position));
    }

    pub fn pointer_leave(&mut self) {
        if self.state != HostState::Ready || !self.is_interactive() {
            return;
        }
        self.post(HostMessage::MouseLeave);
    }

    pub fn set_visible(&mut self, visible: bool) {
        match self.state {
            HostState::Ready => self.post(HostMessage::Visibility { visible }),
            HostState::AwaitingReady => self.pending.visible = Some(visible),
            _ => {}
        }
    }

    /// Tears the widget down: `cleanup`, worker termination, subscription
    /// detach and canvas removal. Every step runs even when an earlier one
    /// fails. Returns the collected errors, which are also logged.
    pub fn unmount(&mut self) -> Vec<HostError> {
        if self.state == HostState::Unmounted {
            return Vec::new();
        }
        if let Some(lease) = self.lease.as_ref() {
            lease.begin_drain();
        }
        let mut errors = Vec::new();

        if let Some(mut port) = self.port.take() {
            if let Err(err) = port.post(HostMessage::Cleanup) {
                errors.push(err);
            }
            if let Err(err) = port.terminate() {
                errors.push(err);
            }
        }
        for mut subscription in self.subscriptions.drain(..) {
            if let Err(err) = subscription.detach() {
                errors.push(err);
            }
        }
        if let Err(err) = self.surface.remove() {
            errors.push(err);
        }

        for err in &errors {
            warn!("{}: teardown: {err}", self.effect);
        }
        self.state = HostState::Unmounted;
        self.lease = None;
        info!("{}: widget unmounted", self.effect);
        errors
    }

    fn post(&mut self, message: HostMessage<S::Transfer>) {
        let Some(port) = self.port.as_mut() else {
            return;
        };
        let kind = message.kind();
        if let Err(err) = port.post(message) {
            warn!("{}: dropped `{kind}`: {err}", self.effect);
        }
    }
}

impl<S, P> Drop for HostController<S, P>
where
    S: HostSurface,
    P: WorkerPort<Surface = S::Transfer>,
{
    fn drop(&mut self) {
        self.unmount();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Active,
    Draining,
}

/// Tracks live sessions per widget id so a widget never gets a second
/// worker while its previous one is still being torn down.
///
/// Constructed explicitly and shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    slots: Arc<Mutex<HashMap<String, SlotState>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `widget_id` until the returned lease is dropped.
    pub fn acquire(&self, widget_id: &str) -> Result<SessionLease, HostError> {
        let mut slots = self.slots.lock();
        if slots.contains_key(widget_id) {
            return Err(HostError::SessionBusy(widget_id.to_string()));
        }
        slots.insert(widget_id.to_string(), SlotState::Active);
        Ok(SessionLease {
            registry: self.clone(),
            widget_id: widget_id.to_string(),
        })
    }

    pub fn is_active(&self, widget_id: &str) -> bool {
        self.slots.lock().get(widget_id) == Some(&SlotState::Active)
    }

    pub fn is_draining(&self, widget_id: &str) -> bool {
        self.slots.lock().get(widget_id) == Some(&SlotState::Draining)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

/// Ownership of one widget id in a [`SessionRegistry`].
#[derive(Debug)]
pub struct SessionLease {
    registry: SessionRegistry,
    widget_id: String,
}

impl SessionLease {
    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    pub fn begin_drain(&self) {
        if let Some(slot) = self.registry.slots.lock().get_mut(&self.widget_id) {
            *slot = SlotState::Draining;
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.registry.slots.lock().remove(&self.widget_id);
    }
}
