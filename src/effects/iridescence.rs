use glam::Vec2;

use super::{
    EffectKind, FrameUniforms, Interactivity, LeaveBehavior, PointerConfig, PointerRange,
    ResolutionLayout, ShaderEffect,
};
use crate::props::PropSet;
use crate::uniforms::UniformBinding;

const FRAGMENT: &str = r#"#version 300 es
precision highp float;

uniform float uTime;
uniform vec3 uColor;
uniform vec3 uResolution;
uniform vec2 uMouse;
uniform float uAmplitude;
uniform float uSpeed;

in vec2 vUv;
out vec4 fragColor;

void main() {
    float mr = min(uResolution.x, uResolution.y);
    vec2 uv = (vUv.xy * 2.0 - 1.0) * uResolution.xy / mr;
    uv += (uMouse - vec2(0.5)) * uAmplitude;

    float d = -uTime * 0.5 * uSpeed;
    float a = 0.0;
    for (float i = 0.0; i < 8.0; ++i) {
        a += cos(i - d - a * uv.x);
        d += sin(uv.y * i + a);
    }
    d += uTime * 0.5 * uSpeed;
    vec3 col = vec3(cos(uv * vec2(d, a)) * 0.6 + 0.4, cos(a + d) * 0.5 + 0.5);
    col = cos(col * cos(vec3(d, a, 2.5)) * 0.5 + 0.5) * uColor;
    fragColor = vec4(col, 1.0);
}
"#;

/// `color`, when sent, wins over the channel props in the same patch.
const BINDINGS: &[UniformBinding] = &[
    UniformBinding::rgb("uColor", ["red", "green", "blue"]),
    UniformBinding::color("uColor", "color"),
    UniformBinding::scalar("uAmplitude", "amplitude"),
    UniformBinding::scalar("uSpeed", "speed"),
];

/// Flowing interference pattern tinted by a single color.
#[derive(Debug, Default)]
pub struct Iridescence;

impl ShaderEffect for Iridescence {
    fn kind(&self) -> EffectKind {
        EffectKind::Iridescence
    }

    fn fragment_source(&self) -> &'static str {
        FRAGMENT
    }

    fn bindings(&self) -> &'static [UniformBinding] {
        BINDINGS
    }

    fn frame_uniforms(&self) -> FrameUniforms {
        FrameUniforms {
            time: "uTime",
            resolution: Some(("uResolution", ResolutionLayout::SizeAndAspect)),
            pointer: Some("uMouse"),
        }
    }

    fn default_props(&self) -> PropSet {
        PropSet::new()
            .with("red", 1.0)
            .with("green", 1.0)
            .with("blue", 1.0)
            .with("speed", 1.0)
            .with("amplitude", 0.1)
            .with("mouseReact", true)
    }

    fn pointer(&self) -> PointerConfig {
        PointerConfig {
            range: PointerRange::Unit,
            smoothing: 0.1,
            rest: Vec2::splat(0.5),
            on_leave: LeaveBehavior::Hold,
            interactivity: Interactivity::Prop("mouseReact"),
        }
    }
}
