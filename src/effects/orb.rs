use glam::Vec2;

use super::{
    damping_factor, EffectKind, FrameUniforms, Interactivity, LeaveBehavior, PointerConfig,
    PointerRange, ResolutionLayout, ShaderEffect, TickContext,
};
use crate::props::PropSet;
use crate::uniforms::{UniformBinding, UniformValue};

const FRAGMENT: &str = r#"#version 300 es
precision highp float;

uniform float iTime;
uniform vec3 iResolution;
uniform float hue;
uniform float hover;
uniform float rot;
uniform float hoverIntensity;

in vec2 vUv;
out vec4 fragColor;

vec3 rgb2yiq(vec3 c) {
    float y = dot(c, vec3(0.299, 0.587, 0.114));
    float i = dot(c, vec3(0.596, -0.274, -0.322));
    float q = dot(c, vec3(0.211, -0.523, 0.312));
    return vec3(y, i, q);
}

vec3 yiq2rgb(vec3 c) {
    float r = c.x + 0.956 * c.y + 0.621 * c.z;
    float g = c.x - 0.272 * c.y - 0.647 * c.z;
    float b = c.x - 1.106 * c.y + 1.703 * c.z;
    return vec3(r, g, b);
}

vec3 adjustHue(vec3 color, float angle) {
    vec3 yiq = rgb2yiq(color);
    float cosA = cos(angle);
    float sinA = sin(angle);
    float i = yiq.y * cosA - yiq.z * sinA;
    float q = yiq.y * sinA + yiq.z * cosA;
    return yiq2rgb(vec3(yiq.x, i, q));
}

vec3 hash33(vec3 p3) {
    p3 = fract(p3 * vec3(0.1031, 0.11369, 0.13787));
    p3 += dot(p3, p3.yxz + 19.19);
    return -1.0 + 2.0 * fract(vec3(p3.x + p3.y, p3.x + p3.z, p3.y + p3.z) * p3.zyx);
}

float snoise3(vec3 p) {
    const float K1 = 0.333333333;
    const float K2 = 0.166666667;
    vec3 i = floor(p + (p.x + p.y + p.z) * K1);
    vec3 d0 = p - (i - (i.x + i.y + i.z) * K2);
    vec3 e = step(vec3(0.0), d0 - d0.yzx);
    vec3 i1 = e * (1.0 - e.zxy);
    vec3 i2 = 1.0 - e.zxy * (1.0 - e);
    vec3 d1 = d0 - (i1 - K2);
    vec3 d2 = d0 - (i2 - K1);
    vec3 d3 = d0 - 0.5;
    vec4 h = max(0.6 - vec4(dot(d0, d0), dot(d1, d1), dot(d2, d2), dot(d3, d3)), 0.0);
    vec4 n = h * h * h * h * vec4(
        dot(d0, hash33(i)),
        dot(d1, hash33(i + i1)),
        dot(d2, hash33(i + i2)),
        dot(d3, hash33(i + 1.0)));
    return dot(vec4(31.316), n);
}

vec4 extractAlpha(vec3 colorIn) {
    float a = max(max(colorIn.r, colorIn.g), colorIn.b);
    return vec4(colorIn.rgb / (a + 1e-5), a);
}

const vec3 baseColor1 = vec3(0.611765, 0.262745, 0.996078);
const vec3 baseColor2 = vec3(0.298039, 0.760784, 0.913725);
const vec3 baseColor3 = vec3(0.062745, 0.078431, 0.600000);
const float innerRadius = 0.6;
const float noiseScale = 0.65;

float light1(float intensity, float attenuation, float dist) {
    return intensity / (1.0 + dist * attenuation);
}

float light2(float intensity, float attenuation, float dist) {
    return intensity / (1.0 + dist * dist * attenuation);
}

vec4 draw(vec2 uv) {
    vec3 color1 = adjustHue(baseColor1, hue);
    vec3 color2 = adjustHue(baseColor2, hue);
    vec3 color3 = adjustHue(baseColor3, hue);

    float ang = atan(uv.y, uv.x);
    float len = length(uv);
    float invLen = len > 0.0 ? 1.0 / len : 0.0;

    float n0 = snoise3(vec3(uv * noiseScale, iTime * 0.5)) * 0.5 + 0.5;
    float r0 = mix(mix(innerRadius, 1.0, 0.4), mix(innerRadius, 1.0, 0.6), n0);
    float d0 = distance(uv, (r0 * invLen) * uv);
    float v0 = light1(1.0, 10.0, d0);
    v0 *= smoothstep(r0 * 1.05, r0, len);
    float cl = cos(ang + iTime * 2.0) * 0.5 + 0.5;

    float a = iTime * -1.0;
    vec2 pos = vec2(cos(a), sin(a)) * r0;
    float d = distance(uv, pos);
    float v1 = light2(1.5, 5.0, d);
    v1 *= light1(1.0, 50.0, d0);

    float v2 = smoothstep(1.0, mix(innerRadius, 1.0, n0 * 0.5), len);
    float v3 = smoothstep(innerRadius, mix(innerRadius, 1.0, 0.5), len);

    vec3 col = mix(color1, color2, cl);
    col = mix(color3, col, v0);
    col = (col + v1) * v2 * v3;
    return extractAlpha(clamp(col, 0.0, 1.0));
}

void main() {
    vec2 fragCoord = vUv * iResolution.xy;
    vec2 center = iResolution.xy * 0.5;
    float size = min(iResolution.x, iResolution.y);
    vec2 uv = (fragCoord - center) / size * 2.0;

    float s = sin(rot);
    float c = cos(rot);
    uv = vec2(c * uv.x - s * uv.y, s * uv.x + c * uv.y);
    uv.x += hover * hoverIntensity * 0.1 * sin(uv.y * 10.0 + iTime);
    uv.y += hover * hoverIntensity * 0.1 * sin(uv.x * 10.0 + iTime);

    vec4 col = draw(uv);
    fragColor = vec4(col.rgb * col.a, col.a);
}
"#;

const BINDINGS: &[UniformBinding] = &[
    UniformBinding::degrees("hue", "hue"),
    UniformBinding::scalar("hoverIntensity", "hoverIntensity"),
];

/// Pointer distance from the orb center, in orb radii, that counts as hovering.
const HOVER_RADIUS: f32 = 0.8;
const HOVER_SMOOTHING: f32 = 0.16;
/// Radians per second while hovered with `rotateOnHover`.
const ROTATION_SPEED: f32 = 0.3;

/// Glowing noise orb that wobbles and spins while hovered.
#[derive(Debug, Default)]
pub struct Orb {
    hover: f32,
    rotation: f32,
}

impl Orb {
    fn hover_target(frame: &TickContext<'_>) -> f32 {
        if frame.props.flag("forceHoverState").unwrap_or(false) {
            return 1.0;
        }
        if !frame.pointer_inside {
            return 0.0;
        }
        let width = frame.resolution.width as f32;
        let height = frame.resolution.height as f32;
        let size = width.min(height);
        let scale = Vec2::new(width / size, height / size);
        if (frame.pointer_target * scale).length() < HOVER_RADIUS {
            1.0
        } else {
            0.0
        }
    }
}

impl ShaderEffect for Orb {
    fn kind(&self) -> EffectKind {
        EffectKind::Orb
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
            pointer: None,
        }
    }

    fn default_props(&self) -> PropSet {
        PropSet::new()
            .with("hue", 0.0)
            .with("hoverIntensity", 0.2)
            .with("rotateOnHover", true)
            .with("forceHoverState", false)
    }

    fn pointer(&self) -> PointerConfig {
        PointerConfig {
            range: PointerRange::Signed,
            smoothing: HOVER_SMOOTHING,
            rest: Vec2::ZERO,
            on_leave: LeaveBehavior::Hold,
            interactivity: Interactivity::Always,
        }
    }

    fn tick_uniforms(&self) -> &'static [&'static str] {
        &["hover", "rot"]
    }

    fn on_tick(&mut self, frame: &mut TickContext<'_>) {
        let target = Self::hover_target(frame);
        self.hover += (target - self.hover) * damping_factor(frame.delta, HOVER_SMOOTHING);
        if frame.props.flag("rotateOnHover").unwrap_or(false) && target > 0.5 {
            self.rotation += frame.delta * ROTATION_SPEED;
        }
        frame.set("hover", UniformValue::Float(self.hover));
        frame.set("rot", UniformValue::Float(self.rotation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SurfaceSize;

    fn tick(
        orb: &mut Orb,
        props: &PropSet,
        pointer: Vec2,
        inside: bool,
    ) -> Vec<(&'static str, UniformValue)> {
        let mut frame = TickContext::new(
            1.0 / 60.0,
            0.0,
            SurfaceSize::new(400, 200),
            pointer,
            pointer,
            inside,
            props,
        );
        orb.on_tick(&mut frame);
        frame.into_updates()
    }

    #[test]
    fn hovering_the_center_raises_hover_and_rotates() {
        let mut orb = Orb::default();
        let props = orb.default_props();
        for _ in 0..120 {
            tick(&mut orb, &props, Vec2::new(0.1, 0.0), true);
        }
        assert!(orb.hover > 0.99);
        assert!(orb.rotation > 0.5);
    }

    #[test]
    fn aspect_correction_excludes_far_edges() {
        let mut orb = Orb::default();
        let props = orb.default_props();
        // x = 0.5 in a 2:1 container is a full radius away from the center.
        tick(&mut orb, &props, Vec2::new(0.5, 0.0), true);
        assert_eq!(orb.hover, 0.0);
        assert_eq!(orb.rotation, 0.0);
    }

    #[test]
    fn forced_hover_ignores_pointer() {
        let mut orb = Orb::default();
        let props = orb
            .default_props()
            .with("forceHoverState", true)
            .with("rotateOnHover", false);
        let updates = tick(&mut orb, &props, Vec2::ZERO, false);
        assert!(orb.hover > 0.0);
        assert_eq!(orb.rotation, 0.0);
        assert_eq!(updates[1], ("rot", UniformValue::Float(0.0)));
    }
}
