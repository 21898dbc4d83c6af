//! Output schemas.

use polyplan_common::types::LogicalType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named, typed field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: LogicalType,
}

impl Field {
    /// Creates a new field.
    pub fn new(name: impl Into<String>, ty: LogicalType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// The ordered list of fields a plan node produces.
///
/// Field names need not be unique. Lookups by name return the last field
/// with that name, which is the one a later clause sees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Creates a schema from fields.
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Creates a schema with a single field.
    pub fn single(name: impl Into<String>, ty: LogicalType) -> Self {
        Self {
            fields: vec![Field::new(name, ty)],
        }
    }

    /// Returns the fields.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the field at `index`.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the index of the field named `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().rposition(|f| f.name == name)
    }

    /// Returns the field named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<(usize, &Field)> {
        self.index_of(name).map(|i| (i, &self.fields[i]))
    }

    /// Returns the field names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Returns true if the schema is a single field of type `ty`.
    #[must_use]
    pub fn is_single(&self, ty: &LogicalType) -> bool {
        self.fields.len() == 1 && &self.fields[0].ty == ty
    }
}

impl FromIterator<Field> for Schema {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_last() {
        let schema = Schema::new(vec![
            Field::new("a", LogicalType::Node),
            Field::new("b", LogicalType::Edge),
            Field::new("a", LogicalType::Int64),
        ]);
        assert_eq!(schema.index_of("a"), Some(2));
        assert_eq!(schema.index_of("c"), None);
        assert_eq!(schema.find("b").map(|(i, f)| (i, f.ty.clone())), Some((1, LogicalType::Edge)));
        assert_eq!(schema.names(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_display() {
        let schema = Schema::single("graph", LogicalType::Graph);
        assert_eq!(schema.to_string(), "[graph: graph]");
        assert!(schema.is_single(&LogicalType::Graph));
        assert!(Schema::default().is_empty());
    }
}
