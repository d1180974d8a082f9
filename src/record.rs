//! Output record of a query.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::Value;
use crate::error::{MdbError, Result};

/// One result row: the query's variable names zipped with a positional
/// value list.
///
/// The variable list and the name lookup table are shared across all
/// records of one query.
#[derive(Debug, Clone)]
pub struct Record {
    variables: Arc<Vec<String>>,
    values: Vec<Value>,
    name_to_index: Arc<HashMap<String, usize>>,
}

impl Record {
    /// Build a record, checking that the value count matches the variable
    /// list.
    pub(crate) fn new(
        variables: Arc<Vec<String>>,
        values: Vec<Value>,
        name_to_index: Arc<HashMap<String, usize>>,
    ) -> Result<Self> {
        if variables.len() != values.len() {
            return Err(MdbError::ArityMismatch {
                variables: variables.len(),
                values: values.len(),
            });
        }
        Ok(Self {
            variables,
            values,
            name_to_index,
        })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Variable names, in query order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Values, positionally aligned with [`Record::variables`].
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at a position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value bound to a variable name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.name_to_index
            .get(name)
            .and_then(|&index| self.values.get(index))
    }

    /// Whether a variable name is bound in this record.
    pub fn has(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// `(name, value)` pairs in query order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.entries().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}
