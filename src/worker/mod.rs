//! Render worker: owns the graphics context and drives the draw loop.
//!
//! [`RenderSession`] holds all per-widget state and is runtime agnostic.
//! [`WorkerThread`] runs a session on a native thread; on `wasm32` the
//! `wasm` module runs one inside a dedicated worker scope.

mod clock;
mod pointer;
mod session;
mod thread;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use clock::AnimationClock;
pub use pointer::DampedPointer;
pub use session::{Dispatch, RenderSession, SessionState};
pub use thread::WorkerThread;
