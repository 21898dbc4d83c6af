//! Output schema command.

use anyhow::Result;
use comfy_table::Cell;
use serde::Serialize;

use polyplan_engine::Config;

use crate::output::{self, Format};
use crate::{OutputFormat, QueryArgs};

/// One output field.
#[derive(Serialize)]
struct FieldOutput {
    index: usize,
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

/// Run the schema command.
pub fn run(args: &QueryArgs, config: Config, format: OutputFormat, quiet: bool) -> Result<()> {
    let compiled = super::compile(args, config)?;
    let fields: Vec<FieldOutput> = compiled
        .root
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(index, f)| FieldOutput {
            index,
            name: f.name.clone(),
            ty: f.ty.to_string(),
        })
        .collect();

    match Format::from(format) {
        Format::Json => output::print_json(&fields, quiet)?,
        Format::Table => {
            let mut table = output::create_table();
            output::add_header(&mut table, &["#", "Name", "Type"]);
            for field in &fields {
                table.add_row(vec![
                    Cell::new(field.index),
                    Cell::new(&field.name),
                    Cell::new(&field.ty),
                ]);
            }
            output::print_table(&table, quiet);
        }
    }
    Ok(())
}
