use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One named axis of a sweep with its ordered integer values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Parameter name, e.g. `cpus`.
    pub name: String,
    /// Values in the order they are swept.
    pub values: Vec<i64>,
}

impl Dimension {
    /// Creates a dimension from a name and its ordered values.
    pub fn new(name: impl Into<String>, values: impl Into<Vec<i64>>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
        }
    }
}

/// A fixed parameter passed to every invocation without being swept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    /// Parameter name, e.g. `level`.
    pub name: String,
    /// Value passed on every invocation.
    pub value: i64,
}

/// Ordered mapping from dimension name to value identifying one grid cell.
///
/// Entries keep the order in which they were supplied; the point is immutable
/// once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConfigurationPoint {
    entries: Vec<(String, i64)>,
}

impl ConfigurationPoint {
    /// Builds a point from ordered `(name, value)` pairs.
    pub fn new(entries: Vec<(String, i64)>) -> Self {
        Self { entries }
    }

    /// Returns the value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    /// Iterates over the entries in construction order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.entries.iter().map(|(key, value)| (key.as_str(), *value))
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no parameter is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Projects the values of `names`, in that order. Missing names are skipped.
    pub fn project(&self, names: &[String]) -> Vec<i64> {
        names.iter().filter_map(|name| self.get(name)).collect()
    }
}

impl Serialize for ConfigurationPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
