//! Plan fingerprint command.

use anyhow::Result;
use serde::Serialize;

use polyplan_core::algebra::QueryKind;
use polyplan_engine::Config;

use crate::output::{self, Format};
use crate::{OutputFormat, QueryArgs};

#[derive(Serialize)]
struct FingerprintOutput {
    kind: QueryKind,
    digest: String,
    nodes: usize,
    fingerprint: String,
}

/// Run the fingerprint command.
pub fn run(args: &QueryArgs, config: Config, format: OutputFormat, quiet: bool) -> Result<()> {
    let compiled = super::compile(args, config)?;
    let output = FingerprintOutput {
        kind: compiled.kind,
        digest: format!("{:016x}", compiled.root.digest()),
        nodes: compiled.root.node_count(),
        fingerprint: compiled.root.fingerprint().to_string(),
    };

    match Format::from(format) {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            let items = [
                ("Kind", format!("{:?}", output.kind)),
                ("Digest", output.digest),
                ("Nodes", output.nodes.to_string()),
                ("Fingerprint", output.fingerprint),
            ];
            output::print_key_value_table(&items, quiet);
        }
    }
    Ok(())
}
