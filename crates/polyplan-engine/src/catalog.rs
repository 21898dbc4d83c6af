//! In-memory catalog.
//!
//! [`MemoryCatalog`] is a plain list of namespaces and entities. It backs the
//! CLI (deserialized from JSON) and the tests; real deployments implement
//! [`Catalog`] over their own catalog service.

use polyplan_common::types::{EntityId, ModelTrait, NamespaceId};
use polyplan_core::algebra::Field;
use polyplan_core::catalog::{Catalog, EntityRef, NamespaceInfo};
use serde::{Deserialize, Serialize};

/// A catalog held entirely in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCatalog {
    namespaces: Vec<NamespaceInfo>,
    entities: Vec<EntityRef>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog with one graph namespace `public` (id 0) holding a
    /// graph named `graph`.
    #[must_use]
    pub fn with_default_graph() -> Self {
        let mut catalog = Self::new();
        let ns = catalog.add_namespace("public", ModelTrait::Graph);
        catalog.add_graph(ns, "graph");
        catalog
    }

    /// Adds a namespace and returns its id.
    pub fn add_namespace(&mut self, name: impl Into<String>, model: ModelTrait) -> NamespaceId {
        let id = NamespaceId::new(self.namespaces.len() as u64);
        self.namespaces.push(NamespaceInfo {
            id,
            name: name.into(),
            model,
        });
        id
    }

    /// Adds a graph to `namespace`.
    pub fn add_graph(&mut self, namespace: NamespaceId, name: impl Into<String>) -> EntityRef {
        let entity = EntityRef::graph(self.next_entity_id(), name, namespace);
        self.entities.push(entity.clone());
        entity
    }

    /// Adds a document collection to `namespace`.
    pub fn add_collection(&mut self, namespace: NamespaceId, name: impl Into<String>) -> EntityRef {
        let entity = EntityRef::collection(self.next_entity_id(), name, namespace);
        self.entities.push(entity.clone());
        entity
    }

    /// Adds a relational table to `namespace`.
    pub fn add_table(
        &mut self,
        namespace: NamespaceId,
        name: impl Into<String>,
        columns: Vec<Field>,
    ) -> EntityRef {
        let entity = EntityRef::table(self.next_entity_id(), name, namespace, columns);
        self.entities.push(entity.clone());
        entity
    }

    fn next_entity_id(&self) -> EntityId {
        let max = self.entities.iter().map(|e| e.id.as_u64()).max().unwrap_or(0);
        EntityId::new(max + 1)
    }
}

impl Catalog for MemoryCatalog {
    fn graph(&self, namespace: NamespaceId) -> Option<EntityRef> {
        self.entities
            .iter()
            .find(|e| e.namespace == namespace && e.model == ModelTrait::Graph)
            .cloned()
    }

    fn namespace(&self, namespace: NamespaceId) -> Option<NamespaceInfo> {
        self.namespaces.iter().find(|n| n.id == namespace).cloned()
    }

    fn entities(&self, namespace: NamespaceId) -> Vec<EntityRef> {
        self.entities
            .iter()
            .filter(|e| e.namespace == namespace)
            .cloned()
            .collect()
    }

    fn entity(&self, id: EntityId) -> Option<EntityRef> {
        self.entities.iter().find(|e| e.id == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyplan_common::types::LogicalType;

    #[test]
    fn test_default_graph() {
        let catalog = MemoryCatalog::with_default_graph();
        let ns = NamespaceId::new(0);
        let graph = catalog.graph(ns).unwrap();
        assert_eq!(graph.name, "graph");
        assert_eq!(graph.id, EntityId::new(1));
        assert_eq!(catalog.namespace(ns).unwrap().model, ModelTrait::Graph);
        assert!(catalog.graph(NamespaceId::new(1)).is_none());
    }

    #[test]
    fn test_mixed_namespace() {
        let mut catalog = MemoryCatalog::with_default_graph();
        let docs = catalog.add_namespace("docs", ModelTrait::Document);
        let people = catalog.add_collection(docs, "Person");
        let rel = catalog.add_namespace("rel", ModelTrait::Relational);
        catalog.add_table(rel, "emp", vec![Field::new("id", LogicalType::Int64)]);

        assert!(catalog.graph(docs).is_none());
        assert_eq!(catalog.entities(docs), vec![people.clone()]);
        assert_eq!(catalog.entity(people.id), Some(people));
        assert_eq!(catalog.entities(rel)[0].schema().to_string(), "[id: int64]");
    }

    #[test]
    fn test_deserialize() {
        let json = r#"{
            "namespaces": [{"id": 0, "name": "public", "model": "Graph"}],
            "entities": [{"id": 7, "name": "g", "namespace": 0, "model": "Graph"}]
        }"#;
        let catalog: MemoryCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.graph(NamespaceId::new(0)).unwrap().id, EntityId::new(7));
    }
}
