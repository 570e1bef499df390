use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use gloo_events::EventListener;
use js_sys::{Reflect, JSON};
use log::{debug, error};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{DedicatedWorkerGlobalScope, MessageEvent, OffscreenCanvas};

use crate::config::PipelineConfig;
use crate::effects::EffectKind;
use crate::gl::WebGlContext;
use crate::protocol::HostMessage;

use super::{Dispatch, RenderSession, SessionState};

struct WorkerRuntime {
    scope: DedicatedWorkerGlobalScope,
    session: RenderSession<WebGlContext>,
    frame_callback: Option<Closure<dyn FnMut(f64)>>,
    frame_request: Option<i32>,
}

type SharedRuntime = Rc<RefCell<WorkerRuntime>>;

/// Entry point of the worker script: runs one render session for
/// `effect` inside the current dedicated worker scope.
#[wasm_bindgen(js_name = startRenderWorker)]
pub fn start_render_worker(effect: &str, config_json: Option<String>) -> Result<(), JsValue> {
    start(effect, config_json.as_deref()).map_err(|err| JsValue::from_str(&format!("{err:#}")))
}

fn start(effect: &str, config_json: Option<&str>) -> Result<()> {
    let kind: EffectKind = effect.parse()?;
    let config = match config_json {
        Some(source) => PipelineConfig::from_json_str(source)?,
        None => PipelineConfig::default(),
    };
    let scope = js_sys::global()
        .dyn_into::<DedicatedWorkerGlobalScope>()
        .map_err(|_| anyhow!("render worker must run in a dedicated worker"))?;

    let runtime = Rc::new(RefCell::new(WorkerRuntime {
        scope: scope.clone(),
        session: RenderSession::new(kind.build(), &config),
        frame_callback: None,
        frame_request: None,
    }));

    let weak = Rc::downgrade(&runtime);
    let callback = Closure::wrap(Box::new(move |timestamp: f64| {
        if let Some(runtime) = weak.upgrade() {
            on_frame(&runtime, timestamp);
        }
    }) as Box<dyn FnMut(f64)>);
    runtime.borrow_mut().frame_callback = Some(callback);

    let listener = EventListener::new(&scope, "message", move |event| {
        let Some(event) = event.dyn_ref::<MessageEvent>() else {
            return;
        };
        if let Err(err) = on_message(&runtime, &event.data()) {
            error!("render worker: {err:#}");
        }
    });
    // The listener lives as long as the worker itself.
    listener.forget();
    debug!("{kind} render worker listening");
    Ok(())
}

fn on_message(runtime: &SharedRuntime, data: &JsValue) -> Result<()> {
    let message = decode_message(data)?;
    let dispatch = runtime.borrow_mut().session.handle(message);
    let terminated = runtime.borrow().session.state() == SessionState::Terminated;
    if terminated {
        release_frames(runtime);
    }
    deliver(runtime, dispatch)
}

fn on_frame(runtime: &SharedRuntime, timestamp: f64) {
    let reschedule = {
        let mut state = runtime.borrow_mut();
        state.frame_request = None;
        state.session.tick(timestamp / 1000.0)
    };
    if reschedule {
        if let Err(err) = request_frame(runtime) {
            error!("render worker: {err:#}");
        }
    }
}

fn deliver(runtime: &SharedRuntime, dispatch: Dispatch) -> Result<()> {
    if let Some(reply) = dispatch.reply {
        let payload = JSON::parse(&reply.to_json()?)
            .map_err(|err| anyhow!("failed to encode reply: {err:?}"))?;
        runtime
            .borrow()
            .scope
            .post_message(&payload)
            .map_err(|err| anyhow!("postMessage failed: {err:?}"))?;
    }
    if dispatch.request_frame {
        request_frame(runtime)?;
    }
    Ok(())
}

fn request_frame(runtime: &SharedRuntime) -> Result<()> {
    let mut state = runtime.borrow_mut();
    let id = {
        let Some(callback) = state.frame_callback.as_ref() else {
            return Ok(());
        };
        state
            .scope
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?
    };
    state.frame_request = Some(id);
    Ok(())
}

/// Cancels an outstanding frame and drops the frame callback.
fn release_frames(runtime: &SharedRuntime) {
    let mut state = runtime.borrow_mut();
    if let Some(id) = state.frame_request.take() {
        if let Err(err) = state.scope.cancel_animation_frame(id) {
            debug!("cancelAnimationFrame failed: {err:?}");
        }
    }
    state.frame_callback = None;
}

/// Splits the transferred canvas out of the envelope and decodes the rest.
fn decode_message(data: &JsValue) -> Result<HostMessage<OffscreenCanvas>> {
    let payload = Reflect::get(data, &JsValue::from_str("data")).unwrap_or(JsValue::UNDEFINED);
    let mut canvas = None;
    if payload.is_object() {
        let key = JsValue::from_str("canvas");
        let value = Reflect::get(&payload, &key).unwrap_or(JsValue::UNDEFINED);
        if let Ok(surface) = value.dyn_into::<OffscreenCanvas>() {
            canvas = Some(surface);
            Reflect::set(&payload, &key, &JsValue::NULL)
                .map_err(|err| anyhow!("failed to detach canvas: {err:?}"))?;
        }
    }
    let json = JSON::stringify(data)
        .map_err(|err| anyhow!("message is not serializable: {err:?}"))?
        .as_string()
        .ok_or_else(|| anyhow!("message did not stringify"))?;
    let message = HostMessage::from_json(&json).context("unrecognized host message")?;
    Ok(message.attach_surface(canvas)?)
}
