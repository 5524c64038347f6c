//! Row messages flowing through the operator graph

use rowflow_sql::FieldReader;
use rowflow_value::Value;
use std::collections::BTreeMap;

/// An ordered bag of field name to value pairs: the body of a row message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: BTreeMap<String, Value>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn set<S: Into<String>, V: Into<Value>>(&mut self, field: S, value: V) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldReader for FieldMap {
    fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (S, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A single row with its scanner-assigned sequence id.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: u64,
    pub body: FieldMap,
}

impl Message {
    pub fn new(id: u64, body: FieldMap) -> Self {
        Self { id, body }
    }
}
