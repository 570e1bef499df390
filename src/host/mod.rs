//! Host controller: bridges a mounted widget to its render worker.
//!
//! [`HostController`] holds the protocol and lifecycle logic and only
//! talks to the environment through [`HostSurface`], [`WorkerPort`] and
//! [`Subscription`]. The `wasm` module implements those for the DOM.

mod controller;
pub mod geometry;
mod headless;
mod transcript;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use controller::{
    HostController, HostState, HostSurface, SessionLease, SessionRegistry, Subscription,
    WorkerPort,
};
pub use geometry::{normalize_pointer, surface_size, ContainerRect};
pub use headless::HeadlessCanvas;
pub use transcript::{Transcript, TranscriptEntry, TranscriptPort};
