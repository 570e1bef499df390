#![cfg(target_arch = "wasm32")]

//! Browser entry points. The same module is loaded by the page, which
//! mounts [`BackgroundWidget`]s, and by each worker script, which calls
//! [`start_render_worker`].

use wasm_bindgen::prelude::*;

pub use crate::host::wasm::{BackgroundWidget, WidgetRegistry};
pub use crate::worker::wasm::start_render_worker;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    let _ = wasm_logger::init(wasm_logger::Config::default());
}
