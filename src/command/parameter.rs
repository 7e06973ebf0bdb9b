use crate::core::{DbType, ParameterDirection, Value};
use std::fmt;

/// Provider-native parameter type, for types the neutral `DbType` cannot express
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderDbType {
    Blob,
    RefCursor,
    XmlType,
}

/// A bound command parameter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DbParameter {
    pub name: String,
    pub value: Value,
    pub db_type: DbType,
    pub direction: ParameterDirection,
    pub size: Option<usize>,
    pub provider_type: Option<ProviderDbType>,
}

impl DbParameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, db_type: DbType) -> Self {
        self.db_type = db_type;
        self
    }

    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }
}

impl fmt::Display for DbParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Ordered parameter list of a command
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterCollection {
    items: Vec<DbParameter>,
}

impl ParameterCollection {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, parameter: DbParameter) {
        self.items.push(parameter);
    }

    /// Insert at `index`, shifting later parameters. An index past the end appends.
    pub fn insert(&mut self, index: usize, parameter: DbParameter) {
        let index = index.min(self.items.len());
        self.items.insert(index, parameter);
    }

    pub fn remove(&mut self, name: &str) -> Option<DbParameter> {
        let idx = self.position(name)?;
        Some(self.items.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<&DbParameter> {
        self.position(name).map(|idx| &self.items[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DbParameter> {
        self.position(name).map(move |idx| &mut self.items[idx])
    }

    pub fn at(&self, index: usize) -> Option<&DbParameter> {
        self.items.get(index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DbParameter> {
        self.items.iter()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|p| p.name == name)
    }
}

impl<'a> IntoIterator for &'a ParameterCollection {
    type Item = &'a DbParameter;
    type IntoIter = std::slice::Iter<'a, DbParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<DbParameter> for ParameterCollection {
    fn from_iter<I: IntoIterator<Item = DbParameter>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
