//! Entity handles and the catalog lookup interface.
//!
//! The catalog itself lives outside the compiler. Plans only hold
//! [`EntityRef`]s, which are resolved once, up front, through [`Catalog`].

use crate::algebra::{Field, Schema};
use polyplan_common::types::{EntityId, LogicalType, ModelTrait, NamespaceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved handle to a persistent graph, collection, or table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Catalog id.
    pub id: EntityId,
    /// Entity name.
    pub name: String,
    /// Namespace the entity belongs to.
    pub namespace: NamespaceId,
    /// Data model the entity is stored under.
    pub model: ModelTrait,
    /// Columns of a relational entity. Ignored for other models.
    #[serde(default)]
    pub columns: Vec<Field>,
}

impl EntityRef {
    /// Creates a graph entity handle.
    pub fn graph(id: EntityId, name: impl Into<String>, namespace: NamespaceId) -> Self {
        Self {
            id,
            name: name.into(),
            namespace,
            model: ModelTrait::Graph,
            columns: Vec::new(),
        }
    }

    /// Creates a document collection handle.
    pub fn collection(id: EntityId, name: impl Into<String>, namespace: NamespaceId) -> Self {
        Self {
            id,
            name: name.into(),
            namespace,
            model: ModelTrait::Document,
            columns: Vec::new(),
        }
    }

    /// Creates a relational table handle.
    pub fn table(
        id: EntityId,
        name: impl Into<String>,
        namespace: NamespaceId,
        columns: Vec<Field>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            namespace,
            model: ModelTrait::Relational,
            columns,
        }
    }

    /// Returns the row shape a full scan of this entity produces.
    ///
    /// A graph scans as one `graph` field, a collection as one document
    /// field `d`, and a table as its columns.
    #[must_use]
    pub fn schema(&self) -> Schema {
        match self.model {
            ModelTrait::Graph => Schema::single("graph", LogicalType::Graph),
            ModelTrait::Document => Schema::single("d", LogicalType::Document),
            ModelTrait::Relational => Schema::new(self.columns.clone()),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.name)
    }
}

/// A namespace as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    /// Namespace id.
    pub id: NamespaceId,
    /// Namespace name.
    pub name: String,
    /// Model the namespace was created for.
    pub model: ModelTrait,
}

/// Name resolution for the compiler.
///
/// Implementations must be cheap to call; the compiler resolves each name at
/// most a handful of times per query.
pub trait Catalog: Send + Sync {
    /// Returns the graph of a namespace, if it has one.
    fn graph(&self, namespace: NamespaceId) -> Option<EntityRef>;

    /// Describes a namespace.
    fn namespace(&self, namespace: NamespaceId) -> Option<NamespaceInfo>;

    /// Returns all entities of a namespace in catalog order.
    fn entities(&self, namespace: NamespaceId) -> Vec<EntityRef>;

    /// Looks up an entity by id.
    fn entity(&self, id: EntityId) -> Option<EntityRef>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_schema_by_model() {
        let ns = NamespaceId::new(0);
        let g = EntityRef::graph(EntityId::new(1), "g", ns);
        assert_eq!(g.schema().to_string(), "[graph: graph]");

        let c = EntityRef::collection(EntityId::new(2), "people", ns);
        assert_eq!(c.schema().to_string(), "[d: document]");

        let t = EntityRef::table(
            EntityId::new(3),
            "emp",
            ns,
            vec![
                Field::new("id", LogicalType::Int64),
                Field::new("name", LogicalType::String),
            ],
        );
        assert_eq!(t.schema().to_string(), "[id: int64, name: string]");
        assert_eq!(t.to_string(), "e3:emp");
    }
}
