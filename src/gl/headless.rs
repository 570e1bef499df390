use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{AttributeLayout, ContextAttributes, GraphicsContext, ShaderStage};
use crate::error::GlError;
use crate::protocol::SurfaceSize;
use crate::uniforms::UniformValue;

/// Every call the headless backend received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateContext(ContextAttributes),
    CompileShader(ShaderStage),
    DeleteShader(u32),
    LinkProgram(u32),
    UseProgram(u32),
    CreateBuffer { id: u32, bytes: usize },
    BindAttribute { name: String, layout: AttributeLayout },
    SetUniform { name: String, value: UniformValue },
    ResizeSurface(SurfaceSize),
    Viewport(SurfaceSize),
    Draw { vertices: i32 },
    DeleteBuffer(u32),
    DeleteProgram(u32),
}

/// Shared, thread-safe call log. Clones observe the same log, so a test
/// can keep one while the worker thread owns the context.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<GlCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: GlCall) {
        self.calls.lock().push(call);
    }

    pub fn snapshot(&self) -> Vec<GlCall> {
        self.calls.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn count(&self, mut predicate: impl FnMut(&GlCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn position(&self, mut predicate: impl FnMut(&GlCall) -> bool) -> Option<usize> {
        self.calls.lock().iter().position(|call| predicate(call))
    }

    pub fn draw_count(&self) -> usize {
        self.count(|call| matches!(call, GlCall::Draw { .. }))
    }

    /// Last value pushed to `uniform`, if any.
    pub fn last_uniform(&self, uniform: &str) -> Option<UniformValue> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            GlCall::SetUniform { name, value } if name == uniform => Some(value.clone()),
            _ => None,
        })
    }
}

/// Where the headless backend should simulate a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Context,
    Compile(ShaderStage),
    Link,
}

/// Stand-in for a transferred canvas on native targets.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    size: SurfaceSize,
    log: CallLog,
    failure: Option<FailurePoint>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: SurfaceSize::new(width, height),
            log: CallLog::new(),
            failure: None,
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn failing_at(mut self, failure: FailurePoint) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[derive(Debug)]
pub struct HeadlessShader {
    id: u32,
    uniforms: Vec<String>,
    attributes: Vec<String>,
}

#[derive(Debug)]
pub struct HeadlessProgram {
    id: u32,
    uniforms: HashSet<String>,
    attributes: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessLocation {
    name: String,
}

#[derive(Debug)]
pub struct HeadlessBuffer(u32);

/// Recording backend. Uniform and attribute lookups only succeed for
/// names the shader sources declare, like a real driver.
#[derive(Debug)]
pub struct HeadlessContext {
    log: CallLog,
    size: SurfaceSize,
    failure: Option<FailurePoint>,
    next_id: u32,
}

impl HeadlessContext {
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsContext for HeadlessContext {
    type Surface = HeadlessSurface;
    type Shader = HeadlessShader;
    type Program = HeadlessProgram;
    type Buffer = HeadlessBuffer;
    type UniformLocation = HeadlessLocation;

    fn bind(surface: HeadlessSurface, attributes: &ContextAttributes) -> Result<Self, GlError> {
        if surface.failure == Some(FailurePoint::Context) {
            return Err(GlError::ContextUnavailable(
                "headless surface refused a context".into(),
            ));
        }
        surface.log.push(GlCall::CreateContext(*attributes));
        Ok(Self {
            log: surface.log,
            size: surface.size,
            failure: surface.failure,
            next_id: 0,
        })
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<HeadlessShader, GlError> {
        self.log.push(GlCall::CompileShader(stage));
        if self.failure == Some(FailurePoint::Compile(stage)) {
            return Err(GlError::ShaderCompile {
                stage,
                log: "forced compile failure".into(),
            });
        }
        if !source.contains("void main") {
            return Err(GlError::ShaderCompile {
                stage,
                log: "missing entry point `main`".into(),
            });
        }
        let (uniforms, attributes) = scan_declarations(stage, source);
        Ok(HeadlessShader {
            id: self.allocate_id(),
            uniforms,
            attributes,
        })
    }

    fn delete_shader(&mut self, shader: HeadlessShader) {
        self.log.push(GlCall::DeleteShader(shader.id));
    }

    fn link_program(
        &mut self,
        vertex: &HeadlessShader,
        fragment: &HeadlessShader,
    ) -> Result<HeadlessProgram, GlError> {
        let id = self.allocate_id();
        self.log.push(GlCall::LinkProgram(id));
        if self.failure == Some(FailurePoint::Link) {
            return Err(GlError::ProgramLink("forced link failure".into()));
        }
        let uniforms = vertex
            .uniforms
            .iter()
            .chain(&fragment.uniforms)
            .cloned()
            .collect();
        let attributes = vertex.attributes.iter().cloned().collect();
        Ok(HeadlessProgram {
            id,
            uniforms,
            attributes,
        })
    }

    fn use_program(&mut self, program: &HeadlessProgram) {
        self.log.push(GlCall::UseProgram(program.id));
    }

    fn create_vertex_buffer(&mut self, data: &[u8]) -> Result<HeadlessBuffer, GlError> {
        let id = self.allocate_id();
        self.log.push(GlCall::CreateBuffer {
            id,
            bytes: data.len(),
        });
        Ok(HeadlessBuffer(id))
    }

    fn bind_attribute(
        &mut self,
        program: &HeadlessProgram,
        name: &str,
        layout: AttributeLayout,
    ) -> bool {
        if !program.attributes.contains(name) {
            return false;
        }
        self.log.push(GlCall::BindAttribute {
            name: name.to_string(),
            layout,
        });
        true
    }

    fn uniform_location(&mut self, program: &HeadlessProgram, name: &str) -> Option<HeadlessLocation> {
        program.uniforms.contains(name).then(|| HeadlessLocation {
            name: name.to_string(),
        })
    }

    fn set_uniform(&mut self, location: &HeadlessLocation, value: &UniformValue) {
        self.log.push(GlCall::SetUniform {
            name: location.name.clone(),
            value: value.clone(),
        });
    }

    fn surface_size(&self) -> SurfaceSize {
        self.size
    }

    fn resize_surface(&mut self, size: SurfaceSize) {
        self.size = size;
        self.log.push(GlCall::ResizeSurface(size));
    }

    fn viewport(&mut self, size: SurfaceSize) {
        self.log.push(GlCall::Viewport(size));
    }

    fn draw_triangles(&mut self, vertex_count: i32) {
        self.log.push(GlCall::Draw {
            vertices: vertex_count,
        });
    }

    fn delete_buffer(&mut self, buffer: HeadlessBuffer) {
        self.log.push(GlCall::DeleteBuffer(buffer.0));
    }

    fn delete_program(&mut self, program: HeadlessProgram) {
        self.log.push(GlCall::DeleteProgram(program.id));
    }
}

/// Collects `uniform` names (both stages) and vertex inputs.
fn scan_declarations(stage: ShaderStage, source: &str) -> (Vec<String>, Vec<String>) {
    let mut uniforms = Vec::new();
    let mut attributes = Vec::new();
    for line in source.lines() {
        let line = line.trim();
        let Some(declaration) = line.strip_suffix(';') else {
            continue;
        };
        let mut tokens = declaration.split_whitespace();
        let qualifier = tokens.next();
        let Some(name) = tokens.last() else {
            continue;
        };
        let name = name.split('[').next().unwrap_or(name).to_string();
        match qualifier {
            Some("uniform") => uniforms.push(name),
            Some("in" | "attribute") if stage == ShaderStage::Vertex => attributes.push(name),
            _ => {}
        }
    }
    (uniforms, attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 300 es\nin vec2 position;\nin vec2 uv;\nout vec2 vUv;\nvoid main() { gl_Position = vec4(position, 0.0, 1.0); }\n";
    const FRAGMENT: &str = "#version 300 es\nprecision highp float;\nuniform float uTime;\nuniform vec3 uStops[3];\nout vec4 color;\nvoid main() { color = vec4(uTime); }\n";

    fn context(surface: HeadlessSurface) -> HeadlessContext {
        HeadlessContext::bind(surface, &ContextAttributes::background()).unwrap()
    }

    #[test]
    fn locations_follow_declarations() {
        let mut gl = context(HeadlessSurface::new(8, 8));
        let vs = gl.compile_shader(ShaderStage::Vertex, VERTEX).unwrap();
        let fs = gl.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap();
        let program = gl.link_program(&vs, &fs).unwrap();
        assert!(gl.uniform_location(&program, "uTime").is_some());
        assert!(gl.uniform_location(&program, "uStops").is_some());
        assert!(gl.uniform_location(&program, "uMouse").is_none());
        let layout = AttributeLayout {
            components: 2,
            stride: 4,
            offset: 0,
        };
        assert!(gl.bind_attribute(&program, "position", layout));
        assert!(!gl.bind_attribute(&program, "vUv", layout));
    }

    #[test]
    fn forced_failures_are_reported() {
        let mut gl = context(
            HeadlessSurface::new(8, 8).failing_at(FailurePoint::Compile(ShaderStage::Fragment)),
        );
        assert!(gl.compile_shader(ShaderStage::Vertex, VERTEX).is_ok());
        let err = gl.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap_err();
        assert!(matches!(
            err,
            GlError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));

        let refused = HeadlessContext::bind(
            HeadlessSurface::new(8, 8).failing_at(FailurePoint::Context),
            &ContextAttributes::background(),
        );
        assert!(refused.is_err());
    }

    #[test]
    fn log_is_shared_between_clones() {
        let log = CallLog::new();
        let mut gl = context(HeadlessSurface::new(8, 8).with_log(log.clone()));
        gl.viewport(SurfaceSize::new(8, 8));
        gl.draw_triangles(3);
        assert_eq!(log.draw_count(), 1);
        assert_eq!(
            log.position(|call| matches!(call, GlCall::Viewport(_))),
            Some(1)
        );
    }
}
