//! Plan explain command.

use anyhow::Result;
use comfy_table::Cell;
use polyplan_core::algebra::{PlanNode, QueryKind};
use polyplan_engine::Config;
use serde::Serialize;

use crate::output::{self, Format};
use crate::{OutputFormat, QueryArgs};

/// A compiled plan, as printed in JSON.
#[derive(Serialize)]
struct ExplainOutput<'a> {
    kind: QueryKind,
    fingerprint: String,
    plan: &'a PlanNode,
}

/// One row of the plan table.
struct PlanRow {
    operator: String,
    model: String,
    schema: String,
}

fn collect_rows(node: &PlanNode, depth: usize, rows: &mut Vec<PlanRow>) {
    rows.push(PlanRow {
        operator: format!("{:indent$}{}", "", node.kind(), indent = depth * 2),
        model: node.model().to_string(),
        schema: node.schema().to_string(),
    });
    for input in node.inputs() {
        collect_rows(input, depth + 1, rows);
    }
}

/// Run the explain command.
pub fn run(args: &QueryArgs, config: Config, format: OutputFormat, quiet: bool) -> Result<()> {
    let compiled = super::compile(args, config)?;

    match Format::from(format) {
        Format::Json => output::print_json(
            &ExplainOutput {
                kind: compiled.kind,
                fingerprint: format!("{:016x}", compiled.root.digest()),
                plan: &compiled.root,
            },
            quiet,
        )?,
        Format::Table => {
            let mut rows = Vec::with_capacity(compiled.root.node_count());
            collect_rows(&compiled.root, 0, &mut rows);
            let mut table = output::create_table();
            output::add_header(&mut table, &["Operator", "Model", "Schema"]);
            for row in rows {
                table.add_row(vec![
                    Cell::new(row.operator),
                    Cell::new(row.model),
                    Cell::new(row.schema),
                ]);
            }
            if !quiet {
                println!("Kind: {:?}\n", compiled.kind);
            }
            output::print_table(&table, quiet);
        }
    }
    Ok(())
}
