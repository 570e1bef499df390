//! Shader payloads for the background widgets.
//!
//! Each effect only describes its program: sources, how props map onto
//! uniforms, which per-frame uniforms it reads, and an optional per-tick
//! hook. The render worker runtime is shared.

use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::props::PropSet;
use crate::protocol::SurfaceSize;
use crate::uniforms::{UniformBinding, UniformValue};

mod aurora;
mod iridescence;
mod light_pillar;
mod orb;
mod threads;

pub use aurora::Aurora;
pub use iridescence::Iridescence;
pub use light_pillar::LightPillar;
pub use orb::Orb;
pub use threads::Threads;

/// Vertex stage shared by every effect: passes the full-screen triangle
/// through and forwards its uv.
pub const FULLSCREEN_VERTEX: &str = r#"#version 300 es
in vec2 position;
in vec2 uv;
out vec2 vUv;

void main() {
    vUv = uv;
    gl_Position = vec4(position, 0.0, 1.0);
}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    Iridescence,
    Orb,
    Aurora,
    Threads,
    LightPillar,
}

impl EffectKind {
    pub fn all() -> &'static [EffectKind] {
        &[
            EffectKind::Iridescence,
            EffectKind::Orb,
            EffectKind::Aurora,
            EffectKind::Threads,
            EffectKind::LightPillar,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Iridescence => "iridescence",
            Self::Orb => "orb",
            Self::Aurora => "aurora",
            Self::Threads => "threads",
            Self::LightPillar => "light-pillar",
        }
    }

    /// Instantiates the payload with fresh per-session state.
    pub fn build(self) -> Box<dyn ShaderEffect> {
        match self {
            Self::Iridescence => Box::new(Iridescence),
            Self::Orb => Box::new(Orb::default()),
            Self::Aurora => Box::new(Aurora),
            Self::Threads => Box::new(Threads),
            Self::LightPillar => Box::new(LightPillar),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = ProtocolError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ProtocolError::UnknownEffect(name.to_string()))
    }
}

/// Layout of the resolution uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionLayout {
    /// `vec2(width, height)`
    Size,
    /// `vec3(width, height, width / height)`
    SizeAndAspect,
}

impl ResolutionLayout {
    pub fn value(self, size: SurfaceSize) -> UniformValue {
        let width = size.width as f32;
        let height = size.height as f32;
        match self {
            Self::Size => UniformValue::Vec2(Vec2::new(width, height)),
            Self::SizeAndAspect => UniformValue::Vec3(glam::Vec3::new(width, height, size.aspect())),
        }
    }
}

/// Uniforms the runtime writes itself rather than deriving from props.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameUniforms {
    pub time: &'static str,
    pub resolution: Option<(&'static str, ResolutionLayout)>,
    pub pointer: Option<&'static str>,
}

/// Range the host maps pointer coordinates into. y grows upward in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerRange {
    /// `[0, 1] × [0, 1]`
    Unit,
    /// `[-1, 1] × [-1, 1]`
    Signed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeaveBehavior {
    Hold,
    ResetTo(Vec2),
}

/// Whether the host should forward pointer events for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interactivity {
    Never,
    Always,
    /// Controlled by a boolean prop.
    Prop(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerConfig {
    pub range: PointerRange,
    /// Time constant of the exponential damping, in seconds.
    pub smoothing: f32,
    /// Damped and target value before the first `mouse` message.
    pub rest: Vec2,
    pub on_leave: LeaveBehavior,
    pub interactivity: Interactivity,
}

impl PointerConfig {
    pub fn is_interactive(&self, props: &PropSet) -> bool {
        match self.interactivity {
            Interactivity::Never => false,
            Interactivity::Always => true,
            Interactivity::Prop(prop) => props.flag(prop).unwrap_or(false),
        }
    }
}

/// Per-frame view handed to [`ShaderEffect::on_tick`].
#[derive(Debug)]
pub struct TickContext<'a> {
    pub delta: f32,
    pub elapsed: f32,
    pub resolution: SurfaceSize,
    /// Raw pointer target, in the effect's range.
    pub pointer_target: Vec2,
    pub pointer_damped: Vec2,
    /// `false` before the first `mouse` message and after `mouseLeave`.
    pub pointer_inside: bool,
    pub props: &'a PropSet,
    updates: Vec<(&'static str, UniformValue)>,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(
        delta: f32,
        elapsed: f32,
        resolution: SurfaceSize,
        pointer_target: Vec2,
        pointer_damped: Vec2,
        pointer_inside: bool,
        props: &'a PropSet,
    ) -> Self {
        Self {
            delta,
            elapsed,
            resolution,
            pointer_target,
            pointer_damped,
            pointer_inside,
            props,
            updates: Vec::new(),
        }
    }

    /// Queues a uniform write for this frame.
    pub fn set(&mut self, uniform: &'static str, value: UniformValue) {
        self.updates.push((uniform, value));
    }

    pub(crate) fn into_updates(self) -> Vec<(&'static str, UniformValue)> {
        self.updates
    }
}

/// A background effect the shader runtime can host.
pub trait ShaderEffect: Send {
    fn kind(&self) -> EffectKind;

    fn vertex_source(&self) -> &'static str {
        FULLSCREEN_VERTEX
    }

    fn fragment_source(&self) -> &'static str;

    /// Uniforms derived from props.
    fn bindings(&self) -> &'static [UniformBinding];

    fn frame_uniforms(&self) -> FrameUniforms;

    fn default_props(&self) -> PropSet;

    fn pointer(&self) -> PointerConfig;

    /// Uniforms written only by [`ShaderEffect::on_tick`].
    fn tick_uniforms(&self) -> &'static [&'static str] {
        &[]
    }

    /// Value written to the time uniform for the given clock reading.
    fn time_value(&self, elapsed: f32, _props: &PropSet) -> f32 {
        elapsed
    }

    fn on_tick(&mut self, _frame: &mut TickContext<'_>) {}
}

/// Exponential approach factor for a step of `delta` seconds.
pub(crate) fn damping_factor(delta: f32, tau: f32) -> f32 {
    if tau <= 0.0 {
        return 1.0;
    }
    1.0 - (-delta / tau).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_names_round_trip() {
        for kind in EffectKind::all() {
            assert_eq!(kind.name().parse::<EffectKind>().unwrap(), *kind);
            assert_eq!(kind.build().kind(), *kind);
        }
        assert_eq!("Light-Pillar".parse::<EffectKind>().unwrap(), EffectKind::LightPillar);
        assert!("plasma".parse::<EffectKind>().is_err());
    }

    #[test]
    fn every_binding_targets_a_declared_uniform() {
        for kind in EffectKind::all() {
            let effect = kind.build();
            let source = effect.fragment_source();
            let frame = effect.frame_uniforms();
            let mut names: Vec<&str> = effect.bindings().iter().map(|b| b.uniform).collect();
            names.push(frame.time);
            names.extend(frame.resolution.map(|(name, _)| name));
            names.extend(frame.pointer);
            names.extend(effect.tick_uniforms());
            for name in names {
                assert!(
                    source.contains(&format!(" {name};")) || source.contains(&format!(" {name}[")),
                    "{kind}: uniform {name} is not declared"
                );
            }
        }
    }

    #[test]
    fn defaults_resolve_every_bound_uniform() {
        for kind in EffectKind::all() {
            let effect = kind.build();
            let props = effect.default_props();
            for binding in effect.bindings() {
                let resolved = effect
                    .bindings()
                    .iter()
                    .filter(|other| other.uniform == binding.uniform)
                    .any(|other| other.resolve(&props).unwrap().is_some());
                assert!(resolved, "{kind}: {} has no default", binding.uniform);
            }
        }
    }

    #[test]
    fn resolution_layouts() {
        let size = SurfaceSize::new(200, 100);
        assert_eq!(
            ResolutionLayout::SizeAndAspect.value(size),
            UniformValue::Vec3(glam::Vec3::new(200.0, 100.0, 2.0))
        );
        assert_eq!(
            ResolutionLayout::Size.value(size),
            UniformValue::Vec2(Vec2::new(200.0, 100.0))
        );
    }

    #[test]
    fn damping_factor_is_frame_rate_independent() {
        let tau = 0.2;
        let one_step = damping_factor(1.0 / 30.0, tau);
        let half = damping_factor(1.0 / 60.0, tau);
        let two_steps = 1.0 - (1.0 - half) * (1.0 - half);
        assert!((one_step - two_steps).abs() < 1e-6);
    }
}
