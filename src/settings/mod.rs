//! The pipeline's own parameter layer and the wiring from parsed values to stages.

use std::{collections::BTreeMap, sync::Arc};

use log::debug;

use crate::{
    error::PipelineError,
    middleware::{
        FieldsFilterMiddleware, FlattenObjectMiddleware, ObjectTemplateMiddleware,
        RenameColumnMiddleware, ReorderColumnOrderMiddleware, ReplaceMiddleware,
        RowTemplateMiddleware, SkipLimitMiddleware, SortByMiddleware, SortColumnsMiddleware,
        TableProcessor, TemplateRenderer,
    },
    output::OutputFormat,
    parameters::{ParameterDefinitions, ParameterTarget, ParsedParameters},
};

const PIPELINE_DEFINITIONS: &str = include_str!("pipeline.yaml");

/// Column name given to the output of a lone `--template`.
pub const SINGLE_TEMPLATE_COLUMN: &str = "_0";

/// Definitions of every flag the pipeline understands.
pub fn pipeline_definitions() -> Result<ParameterDefinitions, PipelineError> {
    Ok(ParameterDefinitions::from_yaml_str(PIPELINE_DEFINITIONS)?)
}

fn get<T: ParameterTarget>(parsed: &ParsedParameters, name: &str) -> Result<Option<T>, PipelineError> {
    Ok(parsed.get_as::<T>(name)?)
}

fn non_negative(name: &str, value: i64) -> Result<usize, PipelineError> {
    usize::try_from(value).map_err(|_| PipelineError::Settings {
        name: name.to_string(),
        message: format!("expected a non-negative count, got {value}"),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldsFilterSettings {
    pub fields: Vec<String>,
    pub filters: Vec<String>,
    pub sort_columns: bool,
}

impl FieldsFilterSettings {
    pub fn from_parameters(parsed: &ParsedParameters) -> Result<Self, PipelineError> {
        Ok(Self {
            fields: get(parsed, "fields")?.unwrap_or_default(),
            filters: get(parsed, "filter")?.unwrap_or_default(),
            sort_columns: get(parsed, "sort-columns")?.unwrap_or(false),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameSettings {
    pub renames: BTreeMap<String, String>,
    pub rename_yaml: Option<String>,
}

impl RenameSettings {
    pub fn from_parameters(parsed: &ParsedParameters) -> Result<Self, PipelineError> {
        Ok(Self {
            renames: get(parsed, "rename")?.unwrap_or_default(),
            rename_yaml: get::<String>(parsed, "rename-yaml")?.filter(|text| !text.trim().is_empty()),
        })
    }

    /// Flag renames first, then the rules of the YAML document.
    pub fn middleware(&self) -> Result<Option<RenameColumnMiddleware>, PipelineError> {
        let mut middleware = RenameColumnMiddleware::new(
            self.renames
                .iter()
                .map(|(from, to)| (from.clone(), to.clone()))
                .collect(),
        );
        if let Some(text) = &self.rename_yaml {
            middleware = middleware.merge(RenameColumnMiddleware::from_yaml(text)?);
        }
        Ok((!middleware.is_empty()).then_some(middleware))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceSettings {
    pub replace_file: Option<String>,
}

impl ReplaceSettings {
    pub fn from_parameters(parsed: &ParsedParameters) -> Result<Self, PipelineError> {
        Ok(Self {
            replace_file: get::<String>(parsed, "replace-file")?
                .filter(|text| !text.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSettings {
    pub templates: Vec<(String, String)>,
    pub use_row_templates: bool,
    pub rename_separator: String,
}

impl TemplateSettings {
    pub fn from_parameters(parsed: &ParsedParameters) -> Result<Self, PipelineError> {
        let mut templates = Vec::new();
        if let Some(template) = get::<String>(parsed, "template")? {
            if !template.is_empty() {
                templates.push((SINGLE_TEMPLATE_COLUMN.to_string(), template));
            }
        }
        let fields: BTreeMap<String, String> = get(parsed, "template-field")?.unwrap_or_default();
        templates.extend(fields);
        Ok(Self {
            templates,
            use_row_templates: get(parsed, "use-row-templates")?.unwrap_or(false),
            rename_separator: get(parsed, "rename-separator")?.unwrap_or_else(|| "_".to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSettings {
    pub sort_by: Vec<String>,
}

impl SortSettings {
    pub fn from_parameters(parsed: &ParsedParameters) -> Result<Self, PipelineError> {
        Ok(Self {
            sort_by: get(parsed, "sort-by")?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipLimitSettings {
    pub skip: usize,
    pub limit: Option<usize>,
}

impl SkipLimitSettings {
    pub fn from_parameters(parsed: &ParsedParameters) -> Result<Self, PipelineError> {
        let skip = non_negative("skip", get::<i64>(parsed, "skip")?.unwrap_or(0))?;
        let limit = non_negative("limit", get::<i64>(parsed, "limit")?.unwrap_or(0))?;
        Ok(Self {
            skip,
            limit: (limit > 0).then_some(limit),
        })
    }

    pub fn is_noop(&self) -> bool {
        self.skip == 0 && self.limit.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub flatten: bool,
    pub with_headers: bool,
    pub csv_separator: u8,
}

impl OutputSettings {
    pub fn from_parameters(parsed: &ParsedParameters) -> Result<Self, PipelineError> {
        let format = match get::<String>(parsed, "output")? {
            Some(raw) => raw.parse().map_err(|err: anyhow::Error| PipelineError::Settings {
                name: "output".to_string(),
                message: err.to_string(),
            })?,
            None => OutputFormat::default(),
        };
        let separator = get::<String>(parsed, "csv-separator")?.unwrap_or_else(|| ",".to_string());
        let csv_separator = match separator.as_bytes() {
            [byte] => *byte,
            _ if separator == "\\t" => b'\t',
            _ => {
                return Err(PipelineError::Settings {
                    name: "csv-separator".to_string(),
                    message: format!("expected a single-byte separator, got '{separator}'"),
                });
            }
        };
        Ok(Self {
            format,
            flatten: get(parsed, "flatten")?.unwrap_or(false),
            with_headers: get(parsed, "with-headers")?.unwrap_or(true),
            csv_separator,
        })
    }

    /// Flat encodings always flatten; structured ones only on request.
    pub fn should_flatten(&self) -> bool {
        self.format.is_flat() || self.flatten
    }
}

/// Builds the processor for one invocation. Stage order: rename, templates, flatten,
/// fields filter, column sorting and ordering, replace/skip, row sort, skip/limit.
pub fn setup_table_processor(
    parsed: &ParsedParameters,
    renderer: Arc<dyn TemplateRenderer>,
) -> Result<TableProcessor, PipelineError> {
    let mut processor = TableProcessor::new();

    if let Some(rename) = RenameSettings::from_parameters(parsed)?.middleware()? {
        processor.add_table_middleware(Box::new(rename));
    }

    let templates = TemplateSettings::from_parameters(parsed)?;
    if !templates.templates.is_empty() {
        if templates.use_row_templates {
            processor.add_table_middleware(Box::new(RowTemplateMiddleware::new(
                templates.templates,
                templates.rename_separator,
                renderer,
            )?));
        } else {
            processor.add_object_middleware(Box::new(ObjectTemplateMiddleware::new(
                templates.templates,
                renderer,
            )?));
        }
    }

    let output = OutputSettings::from_parameters(parsed)?;
    if output.should_flatten() {
        processor.add_table_middleware(Box::new(FlattenObjectMiddleware));
    }

    let fields = FieldsFilterSettings::from_parameters(parsed)?;
    if !fields.fields.is_empty() || !fields.filters.is_empty() {
        processor.add_table_middleware(Box::new(FieldsFilterMiddleware::new(
            fields.fields.clone(),
            fields.filters,
        )));
    }
    if fields.sort_columns {
        processor.add_table_middleware(Box::new(SortColumnsMiddleware));
    }
    if !fields.fields.is_empty() {
        processor.add_table_middleware(Box::new(ReorderColumnOrderMiddleware::new(fields.fields)));
    }

    if let Some(text) = ReplaceSettings::from_parameters(parsed)?.replace_file {
        processor.add_table_middleware(Box::new(ReplaceMiddleware::from_yaml(&text)?));
    }

    let sort = SortSettings::from_parameters(parsed)?;
    if !sort.sort_by.is_empty() {
        processor.add_table_middleware(Box::new(SortByMiddleware::from_columns(&sort.sort_by)));
    }

    let paging = SkipLimitSettings::from_parameters(parsed)?;
    if !paging.is_noop() {
        processor.add_table_middleware(Box::new(SkipLimitMiddleware::new(paging.skip, paging.limit)));
    }

    debug!(
        "Pipeline stages: objects={:?} tables={:?}",
        processor.object_middleware_names(),
        processor.table_middleware_names()
    );
    Ok(processor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::ExprTemplateRenderer, parser::Parser};

    fn parse(tokens: &[&str]) -> ParsedParameters {
        let definitions = pipeline_definitions().unwrap();
        let args: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        let result = Parser::new(definitions).parse(&args).unwrap();
        assert!(!result.has_errors(), "{:?}", result.errors);
        result.parsed_values
    }

    fn stages(tokens: &[&str]) -> (Vec<&'static str>, Vec<&'static str>) {
        let processor = setup_table_processor(&parse(tokens), Arc::new(ExprTemplateRenderer)).unwrap();
        (
            processor.object_middleware_names(),
            processor.table_middleware_names(),
        )
    }

    #[test]
    fn embedded_definitions_load() {
        let definitions = pipeline_definitions().unwrap();
        assert!(definitions.contains("replace-file"));
        assert_eq!(definitions.by_short("o").map(|d| d.name.as_str()), Some("output"));
    }

    #[test]
    fn defaults_give_a_flattening_table_pipeline() {
        let (objects, tables) = stages(&[]);
        assert!(objects.is_empty());
        assert_eq!(tables, vec!["flatten"]);
    }

    #[test]
    fn structured_output_skips_flatten_unless_requested() {
        assert!(stages(&["--output", "json"]).1.is_empty());
        assert_eq!(stages(&["-o", "yaml", "--flatten"]).1, vec!["flatten"]);
    }

    #[test]
    fn stages_follow_the_fixed_order() {
        let (_, tables) = stages(&[
            "--limit",
            "2",
            "--sort-by",
            "-a",
            "--fields",
            "a,b",
            "--rename",
            "x:a",
            "--template-field",
            "c:{{ a }}",
            "--use-row-templates",
            "--sort-columns",
        ]);
        assert_eq!(
            tables,
            vec![
                "rename",
                "row-template",
                "flatten",
                "fields-filter",
                "sort-columns",
                "reorder-columns",
                "sort-by",
                "skip-limit"
            ]
        );
    }

    #[test]
    fn lone_template_becomes_an_object_stage() {
        let parsed = parse(&["--template", "{{ a }}"]);
        let templates = TemplateSettings::from_parameters(&parsed).unwrap();
        assert_eq!(templates.templates, vec![("_0".to_string(), "{{ a }}".to_string())]);
        let (objects, _) = stages(&["--template", "{{ a }}"]);
        assert_eq!(objects, vec!["object-template"]);
    }

    #[test]
    fn template_fields_accept_multi_argument_calls() {
        let parsed = parse(&[
            "--template-field",
            "c:{{ regex_replace(a, \"x\", \"y\") }}",
            "-o",
            "json",
        ]);
        let templates = TemplateSettings::from_parameters(&parsed).unwrap();
        assert_eq!(
            templates.templates,
            vec![(
                "c".to_string(),
                "{{ regex_replace(a, \"x\", \"y\") }}".to_string()
            )]
        );
        let (objects, _) = stages(&["--template-field", "c:{{ default(a, \"x\") }}"]);
        assert_eq!(objects, vec!["object-template"]);
    }

    #[test]
    fn zero_limit_keeps_everything() {
        let settings = SkipLimitSettings::from_parameters(&parse(&["--skip", "1"])).unwrap();
        assert_eq!(settings.skip, 1);
        assert_eq!(settings.limit, None);
        let err = SkipLimitSettings::from_parameters(&parse(&["--skip", "-1"])).unwrap_err();
        assert!(matches!(err, PipelineError::Settings { ref name, .. } if name == "skip"));
    }

    #[test]
    fn output_settings_reject_long_separators() {
        let parsed = parse(&["--output", "csv"]);
        assert_eq!(OutputSettings::from_parameters(&parsed).unwrap().csv_separator, b',');
        let parsed = parse(&["--csv-separator", ";;"]);
        assert!(OutputSettings::from_parameters(&parsed).is_err());
    }
}
