//! Messages exchanged between the host controller and the render worker.
//!
//! Both directions use the `{ "type": ..., "data": ... }` envelope on the
//! wire. The transferred surface of `init` cannot be serialized, so the
//! host message is generic over it and [`HostMessage::split_surface`]
//! separates the two before posting.

use std::convert::Infallible;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::props::PropPatch;

/// Physical surface size in pixels. Both sides are always at least 1,
/// including sizes decoded from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "WireSize")]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Deserialize)]
struct WireSize {
    width: u32,
    height: u32,
}

impl From<WireSize> for SurfaceSize {
    fn from(size: WireSize) -> Self {
        Self::new(size.width, size.height)
    }
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Floors fractional pixel sizes, never returning zero.
    pub fn from_physical(width: f32, height: f32) -> Self {
        let floor = |value: f32| {
            if value.is_finite() && value >= 1.0 {
                value.floor() as u32
            } else {
                1
            }
        };
        Self::new(floor(width), floor(height))
    }

    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Pointer position in the effect's normalized coordinate range, y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for PointerPosition {
    fn from(value: Vec2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }
}

impl From<PointerPosition> for Vec2 {
    fn from(value: PointerPosition) -> Self {
        Vec2::new(value.x, value.y)
    }
}

/// Host → worker messages. `S` is the transferred surface type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum HostMessage<S = ()> {
    Init { canvas: S },
    Props(PropPatch),
    Resize(SurfaceSize),
    Start,
    Stop,
    Mouse(PointerPosition),
    MouseLeave,
    Visibility { visible: bool },
    Cleanup,
}

impl<S> HostMessage<S> {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Props(_) => "props",
            Self::Resize(_) => "resize",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Mouse(_) => "mouse",
            Self::MouseLeave => "mouseLeave",
            Self::Visibility { .. } => "visibility",
            Self::Cleanup => "cleanup",
        }
    }

    pub fn map_surface<T>(self, map: impl FnOnce(S) -> T) -> HostMessage<T> {
        match self.try_map_surface(|surface| Ok::<T, Infallible>(map(surface))) {
            Ok(message) => message,
            Err(never) => match never {},
        }
    }

    pub fn try_map_surface<T, E>(
        self,
        map: impl FnOnce(S) -> Result<T, E>,
    ) -> Result<HostMessage<T>, E> {
        Ok(match self {
            Self::Init { canvas } => HostMessage::Init {
                canvas: map(canvas)?,
            },
            Self::Props(patch) => HostMessage::Props(patch),
            Self::Resize(size) => HostMessage::Resize(size),
            Self::Start => HostMessage::Start,
            Self::Stop => HostMessage::Stop,
            Self::Mouse(position) => HostMessage::Mouse(position),
            Self::MouseLeave => HostMessage::MouseLeave,
            Self::Visibility { visible } => HostMessage::Visibility { visible },
            Self::Cleanup => HostMessage::Cleanup,
        })
    }

    /// Separates the transferable surface from the serializable envelope.
    pub fn split_surface(self) -> (HostMessage<()>, Option<S>) {
        let mut surface = None;
        let message = self.map_surface(|canvas| surface = Some(canvas));
        (message, surface)
    }
}

impl HostMessage<()> {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(source: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Reattaches a surface received out of band. Fails for an `init`
    /// that arrived without one.
    pub fn attach_surface<T>(self, surface: Option<T>) -> Result<HostMessage<T>, ProtocolError> {
        self.try_map_surface(|()| surface.ok_or(ProtocolError::MissingSurface))
    }
}

/// Worker → host messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum WorkerMessage {
    Ready,
    /// GL initialization failed; the session will never become ready.
    Error { message: String },
}

impl WorkerMessage {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a worker message. Envelopes with an unrecognized `type`
    /// yield `Ok(None)` so new message kinds can be added without
    /// breaking older hosts.
    pub fn from_json(source: &str) -> Result<Option<Self>, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(source)?;
        let known = matches!(
            value.get("type").and_then(serde_json::Value::as_str),
            Some("ready" | "error")
        );
        if !known {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }
}
