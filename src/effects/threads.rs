use glam::Vec2;

use super::{
    EffectKind, FrameUniforms, Interactivity, LeaveBehavior, PointerConfig, PointerRange,
    ResolutionLayout, ShaderEffect,
};
use crate::props::PropSet;
use crate::uniforms::UniformBinding;

const FRAGMENT: &str = r#"#version 300 es
precision highp float;

uniform float iTime;
uniform vec3 iResolution;
uniform vec3 uColor;
uniform float uAmplitude;
uniform float uDistance;
uniform vec2 uMouse;

in vec2 vUv;
out vec4 fragColor;

#define PI 3.1415926538

const int lineCount = 40;
const float lineWidth = 7.0;
const float lineBlur = 10.0;

vec2 hash22(vec2 p) {
    p = vec2(dot(p, vec2(127.1, 311.7)), dot(p, vec2(269.5, 183.3)));
    return -1.0 + 2.0 * fract(sin(p) * 43758.5453123);
}

float perlin(vec2 p) {
    vec2 i = floor(p);
    vec2 f = fract(p);
    vec2 u = f * f * (3.0 - 2.0 * f);
    float a = dot(hash22(i), f);
    float b = dot(hash22(i + vec2(1.0, 0.0)), f - vec2(1.0, 0.0));
    float c = dot(hash22(i + vec2(0.0, 1.0)), f - vec2(0.0, 1.0));
    float d = dot(hash22(i + vec2(1.0, 1.0)), f - vec2(1.0, 1.0));
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}

float pixel(float count) {
    return count / max(iResolution.x, iResolution.y);
}

float lineFn(vec2 st, float width, float perc) {
    float splitPoint = 0.1 + perc * 0.4;
    float amplitudeNormal = smoothstep(splitPoint, 0.7, st.x);
    float finalAmplitude = amplitudeNormal * 0.5 * uAmplitude * (1.0 + (uMouse.y - 0.5) * 0.2);
    float timeScaled = iTime / 10.0 + (uMouse.x - 0.5);
    float blur = smoothstep(splitPoint, splitPoint + 0.05, st.x) * perc;

    float xnoise = mix(
        perlin(vec2(timeScaled, st.x + perc) * 2.5),
        perlin(vec2(timeScaled, st.x + timeScaled) * 3.5) / 1.5,
        st.x * 0.3);
    float y = 0.5 + (perc - 0.5) * uDistance + xnoise / 2.0 * finalAmplitude;

    float edge = lineBlur * pixel(1.0) * blur;
    float lineStart = smoothstep(y + width / 2.0 + edge, y, st.y);
    float lineEnd = smoothstep(y, y - width / 2.0 - edge, st.y);
    return clamp((lineStart - lineEnd) * (1.0 - smoothstep(0.0, 1.0, pow(perc, 0.3))), 0.0, 1.0);
}

void main() {
    vec2 uv = vUv;
    float strength = 1.0;
    for (int i = 0; i < lineCount; i++) {
        float p = float(i) / float(lineCount);
        strength *= 1.0 - lineFn(uv, lineWidth * pixel(1.0) * (1.0 - p), p);
    }
    float colorVal = 1.0 - strength;
    fragColor = vec4(uColor * colorVal, colorVal);
}
"#;

const BINDINGS: &[UniformBinding] = &[
    UniformBinding::color("uColor", "color"),
    UniformBinding::scalar("uAmplitude", "amplitude"),
    UniformBinding::scalar("uDistance", "distance"),
];

/// Bundle of noisy lines that bend toward the pointer.
#[derive(Debug, Default)]
pub struct Threads;

impl ShaderEffect for Threads {
    fn kind(&self) -> EffectKind {
        EffectKind::Threads
    }

    fn fragment_source(&self) -> &'static str {
        FRAGMENT
    }

    fn bindings(&self) -> &'static [UniformBinding] {
        BINDINGS
    }

    fn frame_uniforms(&self) -> FrameUniforms {
        FrameUniforms {
            time: "iTime",
            resolution: Some(("iResolution", ResolutionLayout::SizeAndAspect)),
            pointer: Some("uMouse"),
        }
    }

    fn default_props(&self) -> PropSet {
        PropSet::new()
            .with("color", [1.0, 1.0, 1.0])
            .with("amplitude", 1.0)
            .with("distance", 0.0)
            .with("enableMouseInteraction", false)
    }

    fn pointer(&self) -> PointerConfig {
        PointerConfig {
            range: PointerRange::Unit,
            smoothing: 0.33,
            rest: Vec2::splat(0.5),
            on_leave: LeaveBehavior::ResetTo(Vec2::splat(0.5)),
            interactivity: Interactivity::Prop("enableMouseInteraction"),
        }
    }
}
