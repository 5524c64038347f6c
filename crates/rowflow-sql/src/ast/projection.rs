//! Result projection shape produced after binding a SELECT to its sources

use super::select::Column;
use rowflow_value::ValueType;

/// One bound output column of a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    /// Original path/name for the query field.
    pub name: String,
    /// Ordinal position in the statement.
    pub col_pos: usize,
    /// The SQL column this was bound from, when known.
    pub col: Option<Column>,
    /// Was this part of a `SELECT *`?
    pub star: bool,
    /// Output alias.
    pub as_name: String,
    /// Data type of the column.
    pub value_type: ValueType,
}

impl ResultColumn {
    pub fn new<S: Into<String>>(
        as_name: S,
        ordinal: usize,
        col: Option<Column>,
        value_type: ValueType,
    ) -> Self {
        let as_name = as_name.into();
        Self {
            name: as_name.clone(),
            col_pos: ordinal,
            col,
            star: false,
            as_name,
            value_type,
        }
    }
}

/// The ordered output shape of a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub distinct: bool,
    pub columns: Vec<ResultColumn>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column known only by name and type.
    pub fn add_column_short<S: Into<String>>(&mut self, name: S, value_type: ValueType) {
        let ordinal = self.columns.len();
        self.columns
            .push(ResultColumn::new(name, ordinal, None, value_type));
    }

    /// Append a column bound from a SQL column.
    pub fn add_column(&mut self, col: &Column, value_type: ValueType) {
        let ordinal = self.columns.len();
        self.columns.push(ResultColumn::new(
            col.key().to_string(),
            ordinal,
            Some(col.clone()),
            value_type,
        ));
    }
}
