#![cfg(target_arch = "wasm32")]

use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    OffscreenCanvas, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation,
};

use super::{AttributeLayout, ContextAttributes, GraphicsContext, ShaderStage};
use crate::error::GlError;
use crate::protocol::SurfaceSize;
use crate::uniforms::UniformValue;

const FLOAT_BYTES: i32 = std::mem::size_of::<f32>() as i32;

/// WebGL2 context bound to a canvas transferred into the worker.
pub struct WebGlContext {
    canvas: OffscreenCanvas,
    gl: GL,
}

fn context_options(attributes: &ContextAttributes) -> Result<JsValue, GlError> {
    let options = Object::new();
    let set = |key: &str, value: JsValue| {
        Reflect::set(&options, &JsValue::from_str(key), &value)
            .map(|_| ())
            .map_err(|err| GlError::ContextUnavailable(format!("{err:?}")))
    };
    let power = if attributes.high_performance {
        "high-performance"
    } else {
        "default"
    };
    set("powerPreference", JsValue::from_str(power))?;
    set("alpha", JsValue::from_bool(attributes.alpha))?;
    set(
        "premultipliedAlpha",
        JsValue::from_bool(attributes.premultiplied_alpha),
    )?;
    set("depth", JsValue::from_bool(attributes.depth))?;
    set("stencil", JsValue::from_bool(attributes.stencil))?;
    set("antialias", JsValue::from_bool(attributes.antialias))?;
    set(
        "preserveDrawingBuffer",
        JsValue::from_bool(attributes.preserve_drawing_buffer),
    )?;
    Ok(options.into())
}

impl GraphicsContext for WebGlContext {
    type Surface = OffscreenCanvas;
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type UniformLocation = WebGlUniformLocation;

    fn bind(canvas: OffscreenCanvas, attributes: &ContextAttributes) -> Result<Self, GlError> {
        let options = context_options(attributes)?;
        let gl = canvas
            .get_context_with_context_options("webgl2", &options)
            .map_err(|err| GlError::ContextUnavailable(format!("{err:?}")))?
            .ok_or_else(|| GlError::ContextUnavailable("WebGL2 not supported".into()))?
            .dyn_into::<GL>()
            .map_err(|_| GlError::ContextUnavailable("unexpected context type".into()))?;
        Ok(Self { canvas, gl })
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<WebGlShader, GlError> {
        let kind = match stage {
            ShaderStage::Vertex => GL::VERTEX_SHADER,
            ShaderStage::Fragment => GL::FRAGMENT_SHADER,
        };
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or(GlError::ResourceCreation("shader"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        let compiled = self
            .gl
            .get_shader_parameter(&shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if compiled {
            return Ok(shader);
        }
        let log = self
            .gl
            .get_shader_info_log(&shader)
            .unwrap_or_else(|| "unknown error".to_string());
        self.gl.delete_shader(Some(&shader));
        Err(GlError::ShaderCompile { stage, log })
    }

    fn delete_shader(&mut self, shader: WebGlShader) {
        self.gl.delete_shader(Some(&shader));
    }

    fn link_program(
        &mut self,
        vertex: &WebGlShader,
        fragment: &WebGlShader,
    ) -> Result<WebGlProgram, GlError> {
        let program = self
            .gl
            .create_program()
            .ok_or(GlError::ResourceCreation("program"))?;
        self.gl.attach_shader(&program, vertex);
        self.gl.attach_shader(&program, fragment);
        self.gl.link_program(&program);

        let linked = self
            .gl
            .get_program_parameter(&program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if linked {
            return Ok(program);
        }
        let log = self
            .gl
            .get_program_info_log(&program)
            .unwrap_or_else(|| "unknown error".to_string());
        self.gl.delete_program(Some(&program));
        Err(GlError::ProgramLink(log))
    }

    fn use_program(&mut self, program: &WebGlProgram) {
        self.gl.use_program(Some(program));
    }

    fn create_vertex_buffer(&mut self, data: &[u8]) -> Result<WebGlBuffer, GlError> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or(GlError::ResourceCreation("vertex buffer"))?;
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        self.gl
            .buffer_data_with_u8_array(GL::ARRAY_BUFFER, data, GL::STATIC_DRAW);
        Ok(buffer)
    }

    fn bind_attribute(&mut self, program: &WebGlProgram, name: &str, layout: AttributeLayout) -> bool {
        let location = self.gl.get_attrib_location(program, name);
        if location < 0 {
            return false;
        }
        let location = location as u32;
        self.gl.enable_vertex_attrib_array(location);
        self.gl.vertex_attrib_pointer_with_i32(
            location,
            layout.components,
            GL::FLOAT,
            false,
            layout.stride * FLOAT_BYTES,
            layout.offset * FLOAT_BYTES,
        );
        true
    }

    fn uniform_location(&mut self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn set_uniform(&mut self, location: &WebGlUniformLocation, value: &UniformValue) {
        let location = Some(location);
        match value {
            UniformValue::Float(v) => self.gl.uniform1f(location, *v),
            UniformValue::Vec2(v) => self.gl.uniform2f(location, v.x, v.y),
            UniformValue::Vec3(v) => self.gl.uniform3f(location, v.x, v.y, v.z),
            UniformValue::Vec3Array(values) => {
                let flat: Vec<f32> = values.iter().flat_map(|v| v.to_array()).collect();
                self.gl.uniform3fv_with_f32_array(location, &flat);
            }
        }
    }

    fn surface_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.canvas.width(), self.canvas.height())
    }

    fn resize_surface(&mut self, size: SurfaceSize) {
        self.canvas.set_width(size.width);
        self.canvas.set_height(size.height);
    }

    fn viewport(&mut self, size: SurfaceSize) {
        self.gl
            .viewport(0, 0, size.width as i32, size.height as i32);
    }

    fn draw_triangles(&mut self, vertex_count: i32) {
        self.gl.draw_arrays(GL::TRIANGLES, 0, vertex_count);
    }

    fn delete_buffer(&mut self, buffer: WebGlBuffer) {
        self.gl.delete_buffer(Some(&buffer));
    }

    fn delete_program(&mut self, program: WebGlProgram) {
        self.gl.delete_program(Some(&program));
    }
}
