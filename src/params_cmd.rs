use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::ParamsArgs,
    data::Value,
    parameters::{DefinitionDocument, ParameterDefinitions},
    rows::{Row, Table},
    settings::pipeline_definitions,
    table::render_table,
};

const COLUMNS: [&str; 6] = ["name", "type", "short", "default", "required", "help"];

pub fn execute(args: &ParamsArgs) -> Result<()> {
    let (flags, arguments) = match &args.file {
        Some(path) => {
            let document = DefinitionDocument::load(path)
                .with_context(|| format!("Loading parameter definitions from {path:?}"))?;
            (document.flags, document.arguments)
        }
        None => (pipeline_definitions()?, ParameterDefinitions::new()),
    };
    info!(
        "Listing {} flag(s) and {} argument(s)",
        flags.len(),
        arguments.len()
    );
    print!("{}", render_table(&definitions_table(&flags)));
    if !arguments.is_empty() {
        println!();
        print!("{}", render_table(&definitions_table(&arguments)));
    }
    Ok(())
}

/// One row per definition, in declaration order.
pub fn definitions_table(definitions: &ParameterDefinitions) -> Table {
    let rows = definitions
        .iter()
        .map(|definition| {
            let short = definition
                .short_flag
                .as_deref()
                .map(|short| format!("-{short}"))
                .unwrap_or_default();
            let default = definition
                .default
                .as_ref()
                .map(|value| value.display())
                .unwrap_or_default();
            let cells = [
                definition.name.clone(),
                definition.ty.as_str().to_string(),
                short,
                default,
                if definition.required { "yes" } else { "" }.to_string(),
                definition.help.clone(),
            ];
            COLUMNS
                .iter()
                .zip(cells)
                .map(|(column, cell)| (column.to_string(), Value::String(cell)))
                .collect::<Row>()
        })
        .collect();
    Table {
        columns: COLUMNS.iter().map(|column| column.to_string()).collect(),
        rows,
    }
}
