use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use log::{debug, info, warn};
use serde_json::{Map, Value as JsonValue};

use crate::{
    cli::ProcessArgs,
    expr::ExprTemplateRenderer,
    io_utils,
    output::renderer_for,
    parameters::{DefinitionDocument, ParameterDefinitions, ParsedParameters, gather_from_map},
    parser::Parser,
    rows::{Row, Table},
    settings::{OutputSettings, pipeline_definitions, setup_table_processor},
};

pub fn execute(args: &ProcessArgs) -> Result<()> {
    let format = io_utils::resolve_input_format(&args.input, args.input_format.map(Into::into));
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;

    let definitions = load_definitions(args.definitions.as_deref())?;
    let parsed = resolve_parameters(&definitions, args.config.as_deref(), &args.pipeline)?;
    if args.definitions.is_some() {
        for (name, value) in parsed.iter() {
            debug!("Parameter '{name}' = {}", value.display());
        }
    }

    info!(
        "Processing '{}' as {:?} (delimiter '{}')",
        args.input.display(),
        format,
        crate::printable_delimiter(delimiter)
    );
    let text = io_utils::read_input_text(&args.input, encoding)
        .with_context(|| format!("Reading input {:?}", args.input))?;
    let rows = io_utils::read_rows(&text, format, delimiter)
        .with_context(|| format!("Parsing input {:?}", args.input))?;

    let output = OutputSettings::from_parameters(&parsed)?;
    let table = run_pipeline(&parsed, rows)?;
    info!(
        "Writing {} row(s) across {} column(s) as {}",
        table.rows.len(),
        table.columns.len(),
        output.format
    );

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    renderer_for(output.format, output.csv_separator, output.with_headers)
        .render(&table, &mut handle)?;
    handle.flush().context("Flushing output")?;
    Ok(())
}

/// The pipeline flags plus any extra definitions from `path`.
pub fn load_definitions(path: Option<&Path>) -> Result<ParameterDefinitions> {
    let mut definitions = pipeline_definitions()?;
    if let Some(path) = path {
        let document = DefinitionDocument::load(path)
            .with_context(|| format!("Loading parameter definitions from {path:?}"))?;
        debug!(
            "Adding definitions: {}",
            document.flags.names().join(", ")
        );
        definitions
            .merge(document.flags)
            .with_context(|| format!("Merging parameter definitions from {path:?}"))?;
    }
    Ok(definitions)
}

fn load_config(path: &Path) -> Result<Map<String, JsonValue>> {
    let text = fs::read_to_string(path).with_context(|| format!("Reading config {path:?}"))?;
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_yaml::from_str::<JsonValue>(&text)
        .with_context(|| format!("Parsing config {path:?}"))?
    {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Ok(Map::new()),
        other => Err(anyhow!(
            "Config {path:?} must be a mapping of parameter names, got {other}"
        )),
    }
}

/// Defaults, then config file values, then command-line flags.
pub fn resolve_parameters(
    definitions: &ParameterDefinitions,
    config: Option<&Path>,
    flags: &[String],
) -> Result<ParsedParameters> {
    let base = match config {
        Some(path) => {
            let map = load_config(path)?;
            gather_from_map(definitions, &map, true)
                .with_context(|| format!("Reading parameter values from {path:?}"))?
        }
        None => ParsedParameters::new(),
    };
    let parser = Parser::new(definitions.clone());
    let result = parser
        .parse_over(flags, base)
        .context("Parsing pipeline flags")?;
    if !result.arguments.is_empty() {
        warn!(
            "Ignoring positional pipeline arguments: {}",
            result.arguments.iter().join(" ")
        );
    }
    if result.has_errors() {
        return Err(anyhow!(
            "Invalid pipeline flags: {}",
            result.errors.iter().map(|err| err.to_string()).join("; ")
        ));
    }
    Ok(result.parsed_values)
}

/// Ingests every row and returns the finished table.
pub fn run_pipeline(parsed: &ParsedParameters, rows: Vec<Row>) -> Result<Table> {
    let mut processor = setup_table_processor(parsed, Arc::new(ExprTemplateRenderer))
        .context("Building pipeline")?;
    for (idx, row) in rows.into_iter().enumerate() {
        processor
            .process_input_object(row)
            .with_context(|| format!("Processing record {}", idx + 1))?;
    }
    debug!("Ingested {} row(s)", processor.row_count());
    processor.finish().context("Finishing pipeline")
}
