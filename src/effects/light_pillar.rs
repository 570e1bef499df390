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
uniform vec2 uResolution;
uniform vec2 uMouse;
uniform vec3 uTopColor;
uniform vec3 uBottomColor;
uniform float uIntensity;
uniform float uInteractive;
uniform float uGlowAmount;
uniform float uPillarWidth;
uniform float uPillarHeight;
uniform float uNoiseIntensity;
uniform float uPillarRotation;

out vec4 fragColor;

float hash(vec2 p) {
    return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453);
}

mat2 rotate2d(float angle) {
    float s = sin(angle);
    float c = cos(angle);
    return mat2(c, -s, s, c);
}

void main() {
    vec2 uv = (gl_FragCoord.xy * 2.0 - uResolution) / min(uResolution.x, uResolution.y);
    uv = rotate2d(uPillarRotation) * uv;
    if (uInteractive > 0.5) {
        uv -= uMouse * vec2(0.5, 0.25);
    }

    float width = max(uPillarWidth * 0.1, 0.001);
    float halfHeight = max(uPillarHeight, 0.001);
    float sway = sin(uv.y * 2.0 + uTime) * 0.5 * width;
    float dist = abs(uv.x - sway) / width;

    float fade = 1.0 - smoothstep(halfHeight, halfHeight * 2.5, abs(uv.y));
    float core = exp(-dist * dist * 4.0);
    float glow = uGlowAmount * 20.0 / (dist + 0.05);
    float light = (core + glow) * fade * uIntensity;

    float t = clamp(uv.y * 0.5 / halfHeight + 0.5, 0.0, 1.0);
    vec3 color = mix(uBottomColor, uTopColor, t);
    float grain = (hash(gl_FragCoord.xy + fract(uTime)) - 0.5) * 0.1 * uNoiseIntensity;

    float alpha = clamp(light, 0.0, 1.0);
    fragColor = vec4(color * light + grain * alpha, alpha);
}
"#;

const BINDINGS: &[UniformBinding] = &[
    UniformBinding::color("uTopColor", "topColor"),
    UniformBinding::color("uBottomColor", "bottomColor"),
    UniformBinding::scalar("uIntensity", "intensity"),
    UniformBinding::flag("uInteractive", "interactive"),
    UniformBinding::scalar("uGlowAmount", "glowAmount"),
    UniformBinding::scalar("uPillarWidth", "pillarWidth"),
    UniformBinding::scalar("uPillarHeight", "pillarHeight"),
    UniformBinding::scalar("uNoiseIntensity", "noiseIntensity"),
    UniformBinding::degrees("uPillarRotation", "pillarRotation"),
];

/// Vertical beam of light blending two colors, optionally following the pointer.
#[derive(Debug, Default)]
pub struct LightPillar;

impl ShaderEffect for LightPillar {
    fn kind(&self) -> EffectKind {
        EffectKind::LightPillar
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
            resolution: Some(("uResolution", ResolutionLayout::Size)),
            pointer: Some("uMouse"),
        }
    }

    fn default_props(&self) -> PropSet {
        PropSet::new()
            .with("topColor", "#5227FF")
            .with("bottomColor", "#FF9FFC")
            .with("intensity", 1.0)
            .with("rotationSpeed", 0.3)
            .with("interactive", false)
            .with("glowAmount", 0.005)
            .with("pillarWidth", 3.0)
            .with("pillarHeight", 0.4)
            .with("noiseIntensity", 0.5)
            .with("pillarRotation", 0.0)
    }

    fn pointer(&self) -> PointerConfig {
        PointerConfig {
            range: PointerRange::Signed,
            smoothing: 0.1,
            rest: Vec2::ZERO,
            on_leave: LeaveBehavior::ResetTo(Vec2::ZERO),
            interactivity: Interactivity::Prop("interactive"),
        }
    }

    fn time_value(&self, elapsed: f32, props: &PropSet) -> f32 {
        elapsed * props.number("rotationSpeed").unwrap_or(0.3)
    }
}
