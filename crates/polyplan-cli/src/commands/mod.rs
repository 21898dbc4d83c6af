//! CLI command implementations.

pub mod explain;
pub mod fingerprint;
pub mod schema;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use polyplan_adapters::query::cypher::ast::Query;
use polyplan_common::types::{ModelTrait, NamespaceId};
use polyplan_engine::{CompiledQuery, Config, MemoryCatalog, QueryCompiler};

use crate::QueryArgs;

/// Builds the compiler configuration from the global flags.
pub fn config(namespace: u64, target_model: ModelTrait, no_substitution: bool) -> Config {
    let config = Config::default()
        .with_namespace(NamespaceId::new(namespace))
        .with_target_model(target_model)
        .with_plan_cache_capacity(0);
    if no_substitution {
        config.without_substitution()
    } else {
        config
    }
}

/// Reads a JSON-encoded query.
pub fn load_query(path: &Path) -> Result<Query> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a valid query", path.display()))
}

/// Reads a JSON-encoded catalog, or returns the single-graph default.
pub fn load_catalog(path: Option<&Path>) -> Result<MemoryCatalog> {
    let Some(path) = path else {
        return Ok(MemoryCatalog::with_default_graph());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid catalog", path.display()))
}

/// Loads the inputs and compiles the query.
pub fn compile(args: &QueryArgs, config: Config) -> Result<CompiledQuery> {
    let query = load_query(&args.query)?;
    let catalog = load_catalog(args.catalog.as_deref())?;
    tracing::debug!(query = %args.query.display(), "compiling");
    let compiler = QueryCompiler::new(Arc::new(catalog), config);
    Ok(compiler.compile(&query)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyplan_core::algebra::QueryKind;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    const QUERY: &str = r#"{"Single": {"clauses": [
        {"Match": {"patterns": [{"Node": {"variable": "n", "labels": ["Person"]}}]}},
        {"Return": {"items": [{"expression": {"Variable": "n"}}]}}
    ]}}"#;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn args(query: &NamedTempFile, catalog: Option<&NamedTempFile>) -> QueryArgs {
        QueryArgs {
            query: query.path().to_path_buf(),
            catalog: catalog.map(|c| c.path().to_path_buf()),
        }
    }

    #[test]
    fn test_compile_with_default_catalog() {
        let query = write(QUERY);
        let compiled = compile(&args(&query, None), config(0, ModelTrait::Graph, false)).unwrap();
        assert_eq!(compiled.kind, QueryKind::Select);
        assert_eq!(compiled.root.schema().to_string(), "[n: node]");
    }

    #[test]
    fn test_compile_with_catalog_file() {
        let query = write(QUERY);
        let catalog = write(
            r#"{
                "namespaces": [{"id": 0, "name": "docs", "model": "Document"}],
                "entities": [{"id": 1, "name": "Person", "namespace": 0, "model": "Document"}]
            }"#,
        );
        let compiled = compile(
            &args(&query, Some(&catalog)),
            config(0, ModelTrait::Document, false),
        )
        .unwrap();
        assert_eq!(compiled.root.schema().to_string(), "[n: document]");

        let err = compile(
            &args(&query, Some(&catalog)),
            config(0, ModelTrait::Graph, true),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown entity"));
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let err = load_query(&PathBuf::from("/nonexistent/query.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/query.json"));

        let bad = write("{not json");
        let err = load_query(bad.path()).unwrap_err();
        assert!(err.to_string().contains("not a valid query"));
    }
}
