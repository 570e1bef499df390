//! Graphics backends the render worker can drive.
//!
//! The worker only talks to [`GraphicsContext`]; `headless` records calls
//! for native runs and tests, `webgl` binds a transferred `OffscreenCanvas`
//! in the browser.

use std::fmt;

use crate::error::GlError;
use crate::protocol::SurfaceSize;
use crate::uniforms::UniformValue;

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod webgl;

pub use headless::{CallLog, FailurePoint, GlCall, HeadlessContext, HeadlessSurface};
#[cfg(target_arch = "wasm32")]
pub use webgl::WebGlContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Options requested when a context is created on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAttributes {
    /// Asks for the discrete GPU where the platform has one.
    pub high_performance: bool,
    pub alpha: bool,
    pub premultiplied_alpha: bool,
    pub depth: bool,
    pub stencil: bool,
    pub antialias: bool,
    pub preserve_drawing_buffer: bool,
}

impl ContextAttributes {
    /// Full-screen 2D shaders redraw every pixel each frame and never
    /// depth test.
    pub const fn background() -> Self {
        Self {
            high_performance: true,
            alpha: true,
            premultiplied_alpha: true,
            depth: false,
            stencil: false,
            antialias: false,
            preserve_drawing_buffer: false,
        }
    }
}

/// Vertex attribute layout inside an interleaved buffer, in floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    pub components: i32,
    pub stride: i32,
    pub offset: i32,
}

/// Minimal GL surface the render worker needs: one program, one buffer,
/// a table of uniform locations and a draw call.
pub trait GraphicsContext: Sized {
    type Surface;
    type Shader;
    type Program;
    type Buffer;
    type UniformLocation: Clone;

    fn bind(surface: Self::Surface, attributes: &ContextAttributes) -> Result<Self, GlError>;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Shader, GlError>;

    fn delete_shader(&mut self, shader: Self::Shader);

    fn link_program(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Program, GlError>;

    fn use_program(&mut self, program: &Self::Program);

    fn create_vertex_buffer(&mut self, data: &[u8]) -> Result<Self::Buffer, GlError>;

    /// Enables `name` on the bound buffer. Returns `false` when the
    /// program does not use the attribute.
    fn bind_attribute(
        &mut self,
        program: &Self::Program,
        name: &str,
        layout: AttributeLayout,
    ) -> bool;

    fn uniform_location(
        &mut self,
        program: &Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;

    fn set_uniform(&mut self, location: &Self::UniformLocation, value: &UniformValue);

    /// Current backing store size of the bound surface.
    fn surface_size(&self) -> SurfaceSize;

    fn resize_surface(&mut self, size: SurfaceSize);

    fn viewport(&mut self, size: SurfaceSize);

    fn draw_triangles(&mut self, vertex_count: i32);

    fn delete_buffer(&mut self, buffer: Self::Buffer);

    fn delete_program(&mut self, program: Self::Program);
}

/// One triangle that covers the whole viewport: `(x, y, u, v)` per vertex.
pub const FULLSCREEN_TRIANGLE: [f32; 12] = [
    -1.0, -1.0, 0.0, 0.0, //
    3.0, -1.0, 2.0, 0.0, //
    -1.0, 3.0, 0.0, 2.0,
];

pub const FULLSCREEN_VERTEX_COUNT: i32 = 3;
