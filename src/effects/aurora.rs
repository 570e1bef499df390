use glam::Vec2;

use super::{
    EffectKind, FrameUniforms, Interactivity, LeaveBehavior, PointerConfig, PointerRange,
    ResolutionLayout, ShaderEffect,
};
use crate::props::{PropSet, PropValue};
use crate::uniforms::UniformBinding;

const FRAGMENT: &str = r#"#version 300 es
precision highp float;

uniform float uTime;
uniform float uAmplitude;
uniform vec3 uColorStops[3];
uniform vec2 uResolution;
uniform float uBlend;

out vec4 fragColor;

vec3 permute(vec3 x) {
    return mod(((x * 34.0) + 1.0) * x, 289.0);
}

float snoise(vec2 v) {
    const vec4 C = vec4(
        0.211324865405187, 0.366025403784439,
        -0.577350269189626, 0.024390243902439);
    vec2 i = floor(v + dot(v, C.yy));
    vec2 x0 = v - i + dot(i, C.xx);
    vec2 i1 = (x0.x > x0.y) ? vec2(1.0, 0.0) : vec2(0.0, 1.0);
    vec4 x12 = x0.xyxy + C.xxzz;
    x12.xy -= i1;
    i = mod(i, 289.0);

    vec3 p = permute(permute(i.y + vec3(0.0, i1.y, 1.0)) + i.x + vec3(0.0, i1.x, 1.0));
    vec3 m = max(0.5 - vec3(dot(x0, x0), dot(x12.xy, x12.xy), dot(x12.zw, x12.zw)), 0.0);
    m = m * m;
    m = m * m;

    vec3 x = 2.0 * fract(p * C.www) - 1.0;
    vec3 h = abs(x) - 0.5;
    vec3 ox = floor(x + 0.5);
    vec3 a0 = x - ox;
    m *= 1.79284291400159 - 0.85373472095314 * (a0 * a0 + h * h);

    vec3 g;
    g.x = a0.x * x0.x + h.x * x0.y;
    g.yz = a0.yz * x12.xz + h.yz * x12.yw;
    return 130.0 * dot(m, g);
}

vec3 colorRamp(float factor) {
    if (factor < 0.5) {
        return mix(uColorStops[0], uColorStops[1], factor / 0.5);
    }
    return mix(uColorStops[1], uColorStops[2], (factor - 0.5) / 0.5);
}

void main() {
    vec2 uv = gl_FragCoord.xy / uResolution;
    vec3 rampColor = colorRamp(uv.x);

    float height = snoise(vec2(uv.x * 2.0 + uTime * 0.1, uTime * 0.25)) * 0.5 * uAmplitude;
    height = exp(height);
    height = (uv.y * 2.0 - height + 0.2);
    float intensity = 0.6 * height;

    float midPoint = 0.20;
    float auroraAlpha = smoothstep(midPoint - uBlend * 0.5, midPoint + uBlend * 0.5, intensity);
    vec3 auroraColor = intensity * rampColor;
    fragColor = vec4(auroraColor * auroraAlpha, auroraAlpha);
}
"#;

const BINDINGS: &[UniformBinding] = &[
    UniformBinding::color_stops("uColorStops", "colorStops"),
    UniformBinding::scalar("uAmplitude", "amplitude"),
    UniformBinding::scalar("uBlend", "blend"),
];

/// Noise-driven aurora band over a three-stop color ramp.
#[derive(Debug, Default)]
pub struct Aurora;

impl ShaderEffect for Aurora {
    fn kind(&self) -> EffectKind {
        EffectKind::Aurora
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
            pointer: None,
        }
    }

    fn default_props(&self) -> PropSet {
        let stops = vec![
            PropValue::from("#5227FF"),
            PropValue::from("#7cff67"),
            PropValue::from("#5227FF"),
        ];
        PropSet::new()
            .with("colorStops", stops)
            .with("amplitude", 1.0)
            .with("blend", 0.5)
            .with("speed", 1.0)
    }

    fn pointer(&self) -> PointerConfig {
        PointerConfig {
            range: PointerRange::Unit,
            smoothing: 0.1,
            rest: Vec2::splat(0.5),
            on_leave: LeaveBehavior::Hold,
            interactivity: Interactivity::Never,
        }
    }

    fn time_value(&self, elapsed: f32, props: &PropSet) -> f32 {
        elapsed * props.number("speed").unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_scales_time() {
        let props = Aurora.default_props().with("speed", 2.5);
        assert_eq!(Aurora.time_value(2.0, &props), 5.0);
        assert!(!Aurora.pointer().is_interactive(&props));
    }
}
