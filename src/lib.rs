//! Offscreen shader backgrounds for page-builder widgets.
//!
//! Each mounted widget owns one canvas and one render worker. The host
//! controller transfers the canvas to the worker and relays resize,
//! pointer, visibility and prop changes as messages; the worker owns the
//! graphics context, the uniform state and the animation loop. Both sides
//! are plain state machines over small traits, so the whole pipeline runs
//! natively against a recording backend as well as in the browser.

pub mod config;
pub mod effects;
pub mod error;
pub mod gl;
pub mod host;
pub mod props;
pub mod protocol;
pub mod uniforms;
#[cfg(target_arch = "wasm32")]
pub mod wasm;
pub mod worker;

pub use config::PipelineConfig;
pub use effects::{EffectKind, ShaderEffect};
pub use error::{GlError, HostError, ProtocolError};
pub use gl::{GraphicsContext, HeadlessContext, HeadlessSurface};
pub use host::{ContainerRect, HostController, HostState, SessionRegistry};
pub use props::{PropPatch, PropSet, PropValue};
pub use protocol::{HostMessage, PointerPosition, SurfaceSize, WorkerMessage};
pub use uniforms::{UniformState, UniformValue};
pub use worker::{RenderSession, SessionState, WorkerThread};
