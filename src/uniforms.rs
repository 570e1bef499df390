use std::collections::BTreeMap;
use std::fmt;

use glam::{Vec2, Vec3};

use crate::error::ProtocolError;
use crate::props::{PropSet, PropValue};

/// Value of a single shader uniform.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec3Array(Vec<Vec3>),
}

impl UniformValue {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Self::Vec2(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vec3(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for UniformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(value) => write!(f, "{value:.3}"),
            Self::Vec2(value) => write!(f, "({:.3}, {:.3})", value.x, value.y),
            Self::Vec3(value) => write!(f, "({:.3}, {:.3}, {:.3})", value.x, value.y, value.z),
            Self::Vec3Array(values) => {
                write!(f, "[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "({:.3}, {:.3}, {:.3})", value.x, value.y, value.z)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// How a prop value turns into a uniform value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Scalar,
    /// Degrees on the wire, radians in the shader.
    Degrees,
    Flag,
    /// `[r, g, b]` in `[0, 1]` or a `#rgb`/`#rrggbb` string.
    Color,
    /// A list of colors, uploaded as a `vec3` array.
    ColorStops,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformSource {
    Prop(&'static str, Conversion),
    /// Three scalar props composed into one color.
    Rgb([&'static str; 3]),
}

/// Binds one uniform of an effect's program to the props that feed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBinding {
    pub uniform: &'static str,
    pub source: UniformSource,
}

impl UniformBinding {
    pub const fn scalar(uniform: &'static str, prop: &'static str) -> Self {
        Self::prop(uniform, prop, Conversion::Scalar)
    }

    pub const fn degrees(uniform: &'static str, prop: &'static str) -> Self {
        Self::prop(uniform, prop, Conversion::Degrees)
    }

    pub const fn flag(uniform: &'static str, prop: &'static str) -> Self {
        Self::prop(uniform, prop, Conversion::Flag)
    }

    pub const fn color(uniform: &'static str, prop: &'static str) -> Self {
        Self::prop(uniform, prop, Conversion::Color)
    }

    pub const fn color_stops(uniform: &'static str, prop: &'static str) -> Self {
        Self::prop(uniform, prop, Conversion::ColorStops)
    }

    pub const fn rgb(uniform: &'static str, channels: [&'static str; 3]) -> Self {
        Self {
            uniform,
            source: UniformSource::Rgb(channels),
        }
    }

    const fn prop(uniform: &'static str, prop: &'static str, conversion: Conversion) -> Self {
        Self {
            uniform,
            source: UniformSource::Prop(prop, conversion),
        }
    }

    pub fn depends_on(&self, prop: &str) -> bool {
        match self.source {
            UniformSource::Prop(name, _) => name == prop,
            UniformSource::Rgb(channels) => channels.contains(&prop),
        }
    }

    /// Computes the uniform from a full prop set. `Ok(None)` means a
    /// source prop is not known yet.
    pub fn resolve(&self, props: &PropSet) -> Result<Option<UniformValue>, ProtocolError> {
        match self.source {
            UniformSource::Prop(name, conversion) => props
                .get(name)
                .map(|value| convert(name, value, conversion))
                .transpose(),
            UniformSource::Rgb([r, g, b]) => {
                let (Some(r), Some(g), Some(b)) = (props.number(r), props.number(g), props.number(b))
                else {
                    return Ok(None);
                };
                Ok(Some(UniformValue::Vec3(clamp_color(Vec3::new(r, g, b)))))
            }
        }
    }
}

pub fn convert(
    name: &str,
    value: &PropValue,
    conversion: Conversion,
) -> Result<UniformValue, ProtocolError> {
    let invalid = |reason: &str| ProtocolError::InvalidProp {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    match conversion {
        Conversion::Scalar => value
            .as_f32()
            .map(UniformValue::Float)
            .ok_or_else(|| invalid("expected a number")),
        Conversion::Degrees => value
            .as_f32()
            .map(|degrees| UniformValue::Float(degrees.to_radians()))
            .ok_or_else(|| invalid("expected an angle in degrees")),
        Conversion::Flag => value
            .as_flag()
            .map(|flag| UniformValue::Float(if flag { 1.0 } else { 0.0 }))
            .ok_or_else(|| invalid("expected a boolean")),
        Conversion::Color => color_from_value(value)
            .map(UniformValue::Vec3)
            .ok_or_else(|| invalid("expected [r, g, b] or a hex color")),
        Conversion::ColorStops => match value {
            PropValue::List(items) => items
                .iter()
                .map(|item| color_from_value(item).ok_or_else(|| invalid("bad color stop")))
                .collect::<Result<Vec<_>, _>>()
                .map(UniformValue::Vec3Array),
            _ => Err(invalid("expected a list of colors")),
        },
    }
}

fn color_from_value(value: &PropValue) -> Option<Vec3> {
    match value {
        PropValue::Vector(channels) if channels.len() >= 3 => Some(clamp_color(Vec3::new(
            channels[0],
            channels[1],
            channels[2],
        ))),
        PropValue::Text(hex) => parse_hex_color(hex),
        _ => None,
    }
}

fn clamp_color(color: Vec3) -> Vec3 {
    color.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Parses `#rgb` or `#rrggbb` (the leading `#` is optional).
pub fn parse_hex_color(source: &str) -> Option<Vec3> {
    let hex = source.trim().trim_start_matches('#');
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok().map(|v| v as f32 / 255.0);
    match hex.len() {
        3 => {
            let expand = |index: usize| {
                let digit = &hex[index..index + 1];
                channel(&format!("{digit}{digit}"))
            };
            Some(Vec3::new(expand(0)?, expand(1)?, expand(2)?))
        }
        6 => Some(Vec3::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

/// Current value of every uniform the worker has pushed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformState {
    values: BTreeMap<String, UniformValue>,
}

impl UniformState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` and reports whether it differs from the previous one.
    pub fn set(&mut self, name: &str, value: UniformValue) -> bool {
        if self.values.get(name) == Some(&value) {
            return false;
        }
        self.values.insert(name.to_string(), value);
        true
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
