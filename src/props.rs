use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// A single widget property as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Number(f64),
    Vector(Vec<f32>),
    List(Vec<PropValue>),
    Text(String),
}

impl PropValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Number(value) => Some(*value as f32),
            Self::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Booleans and numbers are both accepted as flags; non-zero is `true`.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            Self::Number(value) => Some(*value != 0.0),
            _ => None,
        }
    }
}

impl From<f32> for PropValue {
    fn from(value: f32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<[f32; 3]> for PropValue {
    fn from(value: [f32; 3]) -> Self {
        Self::Vector(value.to_vec())
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(value: Vec<PropValue>) -> Self {
        Self::List(value)
    }
}

/// Ordered property map. Used both for the full set a widget is mounted
/// with and for the partial updates sent after that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropSet {
    values: BTreeMap<String, PropValue>,
}

/// Partial update carried by a `props` message.
pub type PropPatch = PropSet;

impl PropSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(source: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Builder-style insert used for defaults and tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(PropValue::as_f32)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(PropValue::as_flag)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Shallow merge: every key of `patch` overwrites the stored value.
    pub fn merge(&mut self, patch: &PropSet) {
        for (name, value) in &patch.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    /// Entries of `next` that are new or differ from `self`.
    pub fn diff(&self, next: &PropSet) -> PropSet {
        let values = next
            .values
            .iter()
            .filter(|(name, value)| self.values.get(*name) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        PropSet { values }
    }
}

impl<K, V> FromIterator<(K, V)> for PropSet
where
    K: Into<String>,
    V: Into<PropValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_keeps_only_changed_entries() {
        let current = PropSet::new().with("hue", 0.0).with("hoverIntensity", 0.2);
        let next = PropSet::new().with("hue", 180.0).with("hoverIntensity", 0.2);
        let diff = current.diff(&next);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.number("hue"), Some(180.0));
    }

    #[test]
    fn diff_of_identical_sets_is_empty() {
        let props = PropSet::new().with("speed", 1.0).with("color", [1.0, 0.5, 0.0]);
        assert!(props.diff(&props.clone()).is_empty());
    }

    #[test]
    fn merge_overwrites_and_keeps_other_keys() {
        let mut props = PropSet::new().with("speed", 1.0).with("amplitude", 0.1);
        props.merge(&PropSet::new().with("speed", 2.0).with("mouseReact", true));
        assert_eq!(props.number("speed"), Some(2.0));
        assert_eq!(props.number("amplitude"), Some(0.1));
        assert_eq!(props.flag("mouseReact"), Some(true));
    }

    #[test]
    fn parses_mixed_json_values() {
        let props = PropSet::from_json_str(
            r##"{"hue": 45, "rotateOnHover": true, "color": [1, 0.5, 0], "colorStops": ["#fff", "#000"], "topColor": "#5227FF"}"##,
        )
        .unwrap();
        assert_eq!(props.number("hue"), Some(45.0));
        assert_eq!(props.flag("rotateOnHover"), Some(true));
        assert_eq!(
            props.get("color"),
            Some(&PropValue::Vector(vec![1.0, 0.5, 0.0]))
        );
        assert!(matches!(props.get("colorStops"), Some(PropValue::List(items)) if items.len() == 2));
        assert_eq!(props.get("topColor"), Some(&PropValue::from("#5227FF")));
    }

    #[test]
    fn numbers_act_as_flags() {
        let props = PropSet::new().with("interactive", 0.0);
        assert_eq!(props.flag("interactive"), Some(false));
    }
}
