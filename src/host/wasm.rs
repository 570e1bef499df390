use std::cell::RefCell;
use std::rc::{Rc, Weak};

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use gloo_events::EventListener;
use js_sys::{Array, Reflect, JSON};
use log::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    window, HtmlCanvasElement, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    MessageEvent, MouseEvent, OffscreenCanvas, ResizeObserver, Worker, WorkerOptions, WorkerType,
};

use crate::config::PipelineConfig;
use crate::effects::EffectKind;
use crate::error::HostError;
use crate::props::PropSet;
use crate::protocol::HostMessage;

use super::{
    ContainerRect, HostController, HostState, HostSurface, SessionRegistry, Subscription,
    WorkerPort,
};

const POINTER_MOVE: &str = "pointermove";
const POINTER_LEAVE: &str = "pointerleave";

fn js_error(err: JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// Canvas element appended to the widget container.
pub struct DomCanvas {
    canvas: HtmlCanvasElement,
    transferred: bool,
}

impl DomCanvas {
    fn create(container: &HtmlElement) -> Result<Self> {
        let document = window()
            .and_then(|window| window.document())
            .ok_or_else(|| anyhow!("document not available"))?;
        let canvas = document
            .create_element("canvas")
            .map_err(|err| anyhow!("failed to create canvas: {}", js_error(err)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| anyhow!("created element is not a canvas"))?;
        let style = canvas.style();
        for (property, value) in [("display", "block"), ("width", "100%"), ("height", "100%")] {
            style
                .set_property(property, value)
                .map_err(|err| anyhow!("failed to style canvas: {}", js_error(err)))?;
        }
        container
            .append_child(&canvas)
            .map_err(|err| anyhow!("failed to attach canvas: {}", js_error(err)))?;
        Ok(Self {
            canvas,
            transferred: false,
        })
    }
}

impl HostSurface for DomCanvas {
    type Transfer = OffscreenCanvas;

    fn supports_offscreen(&self) -> bool {
        Reflect::has(&self.canvas, &JsValue::from_str("transferControlToOffscreen"))
            .unwrap_or(false)
    }

    fn transfer_control(&mut self) -> Result<OffscreenCanvas, HostError> {
        if self.transferred {
            return Err(HostError::AlreadyTransferred);
        }
        let offscreen = self
            .canvas
            .transfer_control_to_offscreen()
            .map_err(|err| HostError::Transfer(js_error(err)))?;
        self.transferred = true;
        Ok(offscreen)
    }

    fn remove(&mut self) -> Result<(), HostError> {
        if self.canvas.parent_node().is_some() {
            self.canvas.remove();
        }
        Ok(())
    }
}

/// `postMessage` channel to a module worker.
pub struct DomWorkerPort {
    worker: Option<Worker>,
}

impl DomWorkerPort {
    fn spawn(script_url: &str, effect: EffectKind) -> Result<Self, HostError> {
        let options = WorkerOptions::new();
        options.set_type(WorkerType::Module);
        options.set_name(effect.name());
        let worker = Worker::new_with_options(script_url, &options)
            .map_err(|err| HostError::WorkerSpawn(js_error(err)))?;
        Ok(Self {
            worker: Some(worker),
        })
    }
}

impl WorkerPort for DomWorkerPort {
    type Surface = OffscreenCanvas;

    fn post(&mut self, message: HostMessage<OffscreenCanvas>) -> Result<(), HostError> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| HostError::Post("worker was terminated".into()))?;
        let (envelope, canvas) = message.split_surface();
        let json = envelope
            .to_json()
            .map_err(|err| HostError::Post(err.to_string()))?;
        let payload = JSON::parse(&json).map_err(|err| HostError::Post(js_error(err)))?;
        let Some(canvas) = canvas else {
            return worker
                .post_message(&payload)
                .map_err(|err| HostError::Post(js_error(err)));
        };
        let data = Reflect::get(&payload, &JsValue::from_str("data"))
            .map_err(|err| HostError::Post(js_error(err)))?;
        Reflect::set(&data, &JsValue::from_str("canvas"), &canvas)
            .map_err(|err| HostError::Post(js_error(err)))?;
        worker
            .post_message_with_transfer(&payload, &Array::of1(&canvas))
            .map_err(|err| HostError::Post(js_error(err)))
    }

    fn terminate(&mut self) -> Result<(), HostError> {
        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
        Ok(())
    }
}

/// DOM event listener owned by a widget.
struct ListenerSubscription {
    name: &'static str,
    listener: Option<EventListener>,
}

impl Subscription for ListenerSubscription {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detach(&mut self) -> Result<(), HostError> {
        drop(self.listener.take());
        Ok(())
    }
}

struct ResizeSubscription {
    observer: ResizeObserver,
    _callback: Closure<dyn FnMut(Array, ResizeObserver)>,
}

impl Subscription for ResizeSubscription {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn detach(&mut self) -> Result<(), HostError> {
        self.observer.disconnect();
        Ok(())
    }
}

struct VisibilitySubscription {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(Array, IntersectionObserver)>,
}

impl Subscription for VisibilitySubscription {
    fn name(&self) -> &'static str {
        "visibility"
    }

    fn detach(&mut self) -> Result<(), HostError> {
        self.observer.disconnect();
        Ok(())
    }
}

type DomController = HostController<DomCanvas, DomWorkerPort>;
type SharedController = Rc<RefCell<DomController>>;

/// Explicit coordinator shared by every widget on a page.
#[wasm_bindgen]
#[derive(Default)]
pub struct WidgetRegistry {
    inner: SessionRegistry,
}

#[wasm_bindgen]
impl WidgetRegistry {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WidgetRegistry {
        Self::default()
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self, widget_id: &str) -> bool {
        self.inner.is_active(widget_id)
    }
}

/// One mounted background widget: a canvas inside `container` rendered by
/// its own worker.
#[wasm_bindgen]
pub struct BackgroundWidget {
    controller: SharedController,
    container: HtmlElement,
}

#[wasm_bindgen]
impl BackgroundWidget {
    /// Mounts `effect` into `container`. The worker script at `worker_url`
    /// must call `startRenderWorker(self.name)`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        registry: &WidgetRegistry,
        widget_id: &str,
        container: HtmlElement,
        effect: &str,
        props_json: &str,
        worker_url: &str,
        config_json: Option<String>,
    ) -> Result<BackgroundWidget, JsValue> {
        Self::mount(
            registry,
            widget_id,
            container,
            effect,
            props_json,
            worker_url,
            config_json.as_deref(),
        )
        .map_err(|err| JsValue::from_str(&format!("{err:#}")))
    }

    /// Applies the latest props; only changed values reach the worker.
    #[wasm_bindgen(js_name = setProps)]
    pub fn set_props(&mut self, props_json: &str) -> Result<(), JsValue> {
        let props = PropSet::from_json_str(props_json)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        let flipped = self.controller.borrow_mut().set_props(&props);
        if flipped {
            sync_pointer_listeners(&self.controller, &self.container);
        }
        Ok(())
    }

    pub fn unmount(&mut self) {
        self.controller.borrow_mut().unmount();
    }
}

impl BackgroundWidget {
    fn mount(
        registry: &WidgetRegistry,
        widget_id: &str,
        container: HtmlElement,
        effect: &str,
        props_json: &str,
        worker_url: &str,
        config_json: Option<&str>,
    ) -> Result<Self> {
        let kind: EffectKind = effect.parse()?;
        let props = PropSet::from_json_str(props_json).context("invalid widget props")?;
        let config = match config_json {
            Some(source) => PipelineConfig::from_json_str(source)?,
            None => PipelineConfig::default(),
        };
        let lease = registry.inner.acquire(widget_id)?;
        let canvas = DomCanvas::create(&container)?;

        let mut controller = HostController::mount(kind, &props, config, canvas, || {
            DomWorkerPort::spawn(worker_url, kind)
        });
        controller.attach_lease(lease);
        let controller = Rc::new(RefCell::new(controller));

        if controller.borrow().state() == HostState::AwaitingReady {
            attach_worker_listener(&controller)?;
            attach_observers(&controller, &container)?;
            sync_pointer_listeners(&controller, &container);
        }
        Ok(Self {
            controller,
            container,
        })
    }
}

impl Drop for BackgroundWidget {
    fn drop(&mut self) {
        self.controller.borrow_mut().unmount();
    }
}

fn container_rect(container: &HtmlElement) -> ContainerRect {
    let rect = container.get_bounding_client_rect();
    ContainerRect::new(
        rect.left() as f32,
        rect.top() as f32,
        rect.width() as f32,
        rect.height() as f32,
    )
}

fn pixel_ratio() -> f32 {
    window().map_or(1.0, |window| window.device_pixel_ratio() as f32)
}

fn attach_worker_listener(controller: &SharedController) -> Result<()> {
    let worker = {
        let state = controller.borrow();
        let port = state.port().ok_or_else(|| anyhow!("worker missing"))?;
        port.worker
            .clone()
            .ok_or_else(|| anyhow!("worker already terminated"))?
    };
    let weak = Rc::downgrade(controller);
    let listener = EventListener::new(&worker, "message", move |event| {
        let Some(event) = event.dyn_ref::<MessageEvent>() else {
            return;
        };
        let Some(controller) = weak.upgrade() else {
            return;
        };
        match JSON::stringify(&event.data()).ok().and_then(|json| json.as_string()) {
            Some(json) => controller.borrow_mut().handle_worker_json(&json),
            None => warn!("render worker sent an unserializable message"),
        };
    });
    controller
        .borrow_mut()
        .add_subscription(Box::new(ListenerSubscription {
            name: "worker-message",
            listener: Some(listener),
        }));
    Ok(())
}

fn attach_observers(controller: &SharedController, container: &HtmlElement) -> Result<()> {
    controller
        .borrow_mut()
        .resize(container_rect(container), pixel_ratio());

    let weak = Rc::downgrade(controller);
    let observed = container.clone();
    let on_resize = Closure::wrap(Box::new(move |_entries: Array, _observer: ResizeObserver| {
        if let Some(controller) = weak.upgrade() {
            controller
                .borrow_mut()
                .resize(container_rect(&observed), pixel_ratio());
        }
    }) as Box<dyn FnMut(Array, ResizeObserver)>);
    let resize_observer = ResizeObserver::new(on_resize.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("ResizeObserver unavailable: {}", js_error(err)))?;
    resize_observer.observe(container);

    let weak = Rc::downgrade(controller);
    let on_intersect = Closure::wrap(Box::new(
        move |entries: Array, _observer: IntersectionObserver| {
            let visible = entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                .last()
                .map(|entry| entry.is_intersecting());
            if let (Some(visible), Some(controller)) = (visible, weak.upgrade()) {
                controller.borrow_mut().set_visible(visible);
            }
        },
    ) as Box<dyn FnMut(Array, IntersectionObserver)>);
    let intersection_observer = IntersectionObserver::new(on_intersect.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("IntersectionObserver unavailable: {}", js_error(err)))?;
    intersection_observer.observe(container);

    let mut state = controller.borrow_mut();
    state.add_subscription(Box::new(ResizeSubscription {
        observer: resize_observer,
        _callback: on_resize,
    }));
    state.add_subscription(Box::new(VisibilitySubscription {
        observer: intersection_observer,
        _callback: on_intersect,
    }));
    Ok(())
}

/// Attaches pointer listeners while the effect is interactive and removes
/// them otherwise.
fn sync_pointer_listeners(controller: &SharedController, container: &HtmlElement) {
    let interactive = controller.borrow().is_interactive();
    let mut state = controller.borrow_mut();
    state.remove_subscriptions(POINTER_MOVE);
    state.remove_subscriptions(POINTER_LEAVE);
    if !interactive {
        return;
    }
    let Some(window) = window() else {
        return;
    };

    let weak: Weak<RefCell<DomController>> = Rc::downgrade(controller);
    let observed = container.clone();
    let on_move = EventListener::new(&window, POINTER_MOVE, move |event| {
        let Some(event) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        if let Some(controller) = weak.upgrade() {
            let client = Vec2::new(event.client_x() as f32, event.client_y() as f32);
            controller
                .borrow_mut()
                .pointer_move(client, container_rect(&observed));
        }
    });

    let weak = Rc::downgrade(controller);
    let on_leave = EventListener::new(container, POINTER_LEAVE, move |_| {
        if let Some(controller) = weak.upgrade() {
            controller.borrow_mut().pointer_leave();
        }
    });

    state.add_subscription(Box::new(ListenerSubscription {
        name: POINTER_MOVE,
        listener: Some(on_move),
    }));
    state.add_subscription(Box::new(ListenerSubscription {
        name: POINTER_LEAVE,
        listener: Some(on_leave),
    }));
}
