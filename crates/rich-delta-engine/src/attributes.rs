use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved attribute carrying a line's type on its terminating newline.
pub const LINE_TYPE_ATTRIBUTE: &str = "$type";

/// Value of a single attribute.
///
/// JSON `null` is not a value: it means "not set" and is dropped when an
/// attribute map is deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(value) => write!(f, "{value}"),
            AttributeValue::Number(value) => write!(f, "{value}"),
            AttributeValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Number(value.into())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value.into())
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::Number(value.into())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// Overrides applied by [`Attributes::merge`]; `None` removes the attribute.
pub type AttributeOverrides = BTreeMap<String, Option<AttributeValue>>;

/// Attribute set of a run (or of a line, when carried by a newline).
///
/// Absent and `null` entries are equivalent, so the map only ever stores set
/// attributes. It is ordered to make equality and serialization deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<AttributeValue>>",
    into = "BTreeMap<String, AttributeValue>"
)]
pub struct Attributes(BTreeMap<String, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for constructing fixtures.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }

    /// Returns `self` with `overrides` applied. Overrides win; a `None`
    /// override removes the key instead of storing a null.
    pub fn merge(&self, overrides: &AttributeOverrides) -> Attributes {
        let mut merged = self.clone();
        for (name, value) in overrides {
            match value {
                Some(value) => {
                    merged.0.insert(name.clone(), value.clone());
                }
                None => {
                    merged.0.remove(name);
                }
            }
        }
        merged
    }

    /// Attributes present in every set with the same value.
    ///
    /// An empty input yields an empty set.
    pub fn intersect_across_runs<'a>(sets: impl IntoIterator<Item = &'a Attributes>) -> Attributes {
        let mut sets = sets.into_iter();
        let Some(first) = sets.next() else {
            return Attributes::default();
        };
        let mut common = first.clone();
        for set in sets {
            common.0.retain(|name, value| set.get(name) == Some(value));
            if common.is_empty() {
                break;
            }
        }
        common
    }

    /// Copy of the set without the line-type tag.
    ///
    /// Characters other than newlines never carry a line type.
    pub fn without_line_type(&self) -> Attributes {
        let mut attributes = self.clone();
        attributes.0.remove(LINE_TYPE_ATTRIBUTE);
        attributes
    }
}

impl From<BTreeMap<String, Option<AttributeValue>>> for Attributes {
    fn from(map: BTreeMap<String, Option<AttributeValue>>) -> Self {
        Attributes(
            map.into_iter()
                .filter_map(|(name, value)| value.map(|value| (name, value)))
                .collect(),
        )
    }
}

impl From<Attributes> for BTreeMap<String, AttributeValue> {
    fn from(attributes: Attributes) -> Self {
        attributes.0
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Attributes(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}
