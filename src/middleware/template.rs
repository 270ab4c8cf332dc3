//! Template-driven columns.
//!
//! Templates are rendered against a view of a row. In the row variant, dots in keys
//! can be replaced by a separator so flattened fields are addressable by plain
//! names; the whole view is also exposed under `_row`.

use std::{fmt, sync::Arc};

use super::{ObjectMiddleware, TableMiddleware, columns::preserve_column_order};
use crate::{
    data::Value,
    error::{PipelineError, TemplateError},
    rows::{Row, Table},
};

pub const ROW_KEY: &str = "_row";

/// Renders a template string against a record view.
pub trait TemplateRenderer: fmt::Debug + Send + Sync {
    /// Rejects templates that can never render. The default accepts everything.
    fn check(&self, _template: &str) -> Result<(), TemplateError> {
        Ok(())
    }

    fn render(&self, template: &str, view: &Row) -> Result<String, TemplateError>;
}

fn check_all(
    stage: &'static str,
    templates: &[(String, String)],
    renderer: &dyn TemplateRenderer,
) -> Result<(), PipelineError> {
    for (column, template) in templates {
        renderer
            .check(template)
            .map_err(|source| PipelineError::Template {
                stage,
                column: column.clone(),
                template: template.clone(),
                source,
            })?;
    }
    Ok(())
}

fn render_columns(
    stage: &'static str,
    templates: &[(String, String)],
    renderer: &dyn TemplateRenderer,
    view: &Row,
) -> Result<Vec<(String, Value)>, PipelineError> {
    templates
        .iter()
        .map(|(column, template)| {
            renderer
                .render(template, view)
                .map(|rendered| (column.clone(), Value::String(rendered)))
                .map_err(|source| PipelineError::Template {
                    stage,
                    column: column.clone(),
                    template: template.clone(),
                    source,
                })
        })
        .collect()
}

fn with_self_key(mut view: Row) -> Row {
    let copy = view.clone();
    view.insert(ROW_KEY, Value::Row(copy));
    view
}

const ROW_STAGE: &str = "row-template";

/// Adds one column per template to every row of the table.
pub struct RowTemplateMiddleware {
    templates: Vec<(String, String)>,
    rename_separator: String,
    renderer: Arc<dyn TemplateRenderer>,
}

impl fmt::Debug for RowTemplateMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowTemplateMiddleware")
            .field("templates", &self.templates)
            .field("rename_separator", &self.rename_separator)
            .finish_non_exhaustive()
    }
}

impl RowTemplateMiddleware {
    pub fn new(
        templates: Vec<(String, String)>,
        rename_separator: impl Into<String>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Result<Self, PipelineError> {
        check_all(ROW_STAGE, &templates, renderer.as_ref())?;
        Ok(Self {
            templates,
            rename_separator: rename_separator.into(),
            renderer,
        })
    }

    fn view(&self, row: &Row) -> Row {
        let view: Row = row
            .iter()
            .map(|(key, value)| {
                let key = if self.rename_separator.is_empty() {
                    key.to_string()
                } else {
                    key.replace('.', &self.rename_separator)
                };
                (key, value.clone())
            })
            .collect();
        with_self_key(view)
    }
}

impl TableMiddleware for RowTemplateMiddleware {
    fn name(&self) -> &'static str {
        ROW_STAGE
    }

    fn process(&self, table: Table) -> Result<Table, PipelineError> {
        let mut rows = Vec::with_capacity(table.rows.len());
        for mut row in table.rows {
            let view = self.view(&row);
            for (column, value) in
                render_columns(ROW_STAGE, &self.templates, self.renderer.as_ref(), &view)?
            {
                row.insert(column, value);
            }
            rows.push(row);
        }
        let mut rendered = Table {
            columns: Vec::new(),
            rows,
        };
        let mut declared = table.columns;
        for (column, _) in &self.templates {
            if !declared.contains(column) {
                declared.push(column.clone());
            }
        }
        rendered.columns = preserve_column_order(&declared, &rendered.row_keys());
        Ok(rendered)
    }
}

const OBJECT_STAGE: &str = "object-template";

/// Replaces each ingested object by a record holding only the rendered columns.
pub struct ObjectTemplateMiddleware {
    templates: Vec<(String, String)>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl fmt::Debug for ObjectTemplateMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTemplateMiddleware")
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl ObjectTemplateMiddleware {
    pub fn new(
        templates: Vec<(String, String)>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Result<Self, PipelineError> {
        check_all(OBJECT_STAGE, &templates, renderer.as_ref())?;
        Ok(Self {
            templates,
            renderer,
        })
    }
}

impl ObjectMiddleware for ObjectTemplateMiddleware {
    fn name(&self) -> &'static str {
        OBJECT_STAGE
    }

    fn process(&self, object: Row) -> Result<Vec<Row>, PipelineError> {
        let view = with_self_key(object);
        let rendered = render_columns(OBJECT_STAGE, &self.templates, self.renderer.as_ref(), &view)?;
        Ok(vec![rendered.into_iter().collect()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replaces `{key}` with the display value of `key`; fails on unknown keys.
    #[derive(Debug)]
    struct Braces;

    impl TemplateRenderer for Braces {
        fn check(&self, template: &str) -> Result<(), TemplateError> {
            if template.matches('{').count() == template.matches('}').count() {
                Ok(())
            } else {
                Err(TemplateError::new("unbalanced braces"))
            }
        }

        fn render(&self, template: &str, view: &Row) -> Result<String, TemplateError> {
            let mut out = template.to_string();
            while let Some(start) = out.find('{') {
                let end = out[start..]
                    .find('}')
                    .map(|idx| start + idx)
                    .ok_or_else(|| TemplateError::new("unbalanced braces"))?;
                let key = &out[start + 1..end];
                let value = view
                    .get(key)
                    .ok_or_else(|| TemplateError::new(format!("no field {key}")))?
                    .as_display();
                out.replace_range(start..=end, &value);
            }
            Ok(out)
        }
    }

    fn row() -> Row {
        [
            ("name".to_string(), Value::from("ada")),
            ("addr.city".to_string(), Value::from("london")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn row_templates_see_renamed_keys_and_append_columns() {
        let middleware = RowTemplateMiddleware::new(
            vec![("where".into(), "{name}@{addr_city}".into())],
            "_",
            Arc::new(Braces),
        )
        .unwrap();
        let table = middleware.process(Table::from_rows(vec![row()])).unwrap();
        assert_eq!(table.columns, vec!["name", "addr.city", "where"]);
        assert_eq!(
            table.rows[0].get("where"),
            Some(&Value::from("ada@london"))
        );
    }

    #[test]
    fn failures_name_the_column_and_template() {
        let middleware = RowTemplateMiddleware::new(
            vec![("broken".into(), "{missing}".into())],
            "",
            Arc::new(Braces),
        )
        .unwrap();
        let err = middleware.process(Table::from_rows(vec![row()])).unwrap_err();
        match err {
            PipelineError::Template {
                column, template, ..
            } => {
                assert_eq!(column, "broken");
                assert_eq!(template, "{missing}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(RowTemplateMiddleware::new(
            vec![("bad".into(), "{oops".into())],
            "",
            Arc::new(Braces)
        )
        .is_err());
    }

    #[test]
    fn object_templates_replace_the_record() {
        let middleware =
            ObjectTemplateMiddleware::new(vec![("_0".into(), "{name}".into())], Arc::new(Braces))
                .unwrap();
        let out = middleware.process(row()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].keys().collect::<Vec<_>>(), vec!["_0"]);
    }
}
