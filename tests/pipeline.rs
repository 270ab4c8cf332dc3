mod common;

use common::{TestWorkspace, args, rows};
use proptest::prelude::*;
use rowglaze::{
    data::Value,
    error::PipelineError,
    middleware::{
        FlattenObjectMiddleware, ReplaceMiddleware, SortColumnsMiddleware, TableMiddleware,
        TableProcessor, flatten_row, reorder_columns,
    },
    parser::Parser,
    process::run_pipeline,
    rows::{Row, Table},
    settings::pipeline_definitions,
};

fn pipeline(tokens: &[&str], input: &str) -> Result<Table, anyhow::Error> {
    let parsed = Parser::new(pipeline_definitions()?)
        .parse(&args(tokens))?
        .parsed_values;
    run_pipeline(&parsed, rows(input))
}

fn column(table: &Table, name: &str) -> Vec<String> {
    table
        .rows
        .iter()
        .map(|row| row.get(name).map(Value::as_display).unwrap_or_default())
        .collect()
}

#[test]
fn replace_document_rewrites_and_drops_rows() {
    let replace = ReplaceMiddleware::from_yaml(
        r#"
msg:
  skip: [DEBUG]
  replace:
    - foo: bar
"#,
    )
    .unwrap();
    let table = replace
        .process(Table::from_rows(rows(
            r#"[{"msg":"foo info"},{"msg":"DEBUG noise"}]"#,
        )))
        .unwrap();
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].get("msg"), Some(&Value::from("bar info")));
}

#[test]
fn flatten_then_sort_columns_ignores_input_order() {
    let mut processor = TableProcessor::new();
    processor.add_table_middleware(Box::new(FlattenObjectMiddleware));
    processor.add_table_middleware(Box::new(SortColumnsMiddleware));
    for row in rows(r#"[{"b":2,"a":1},{"a":1}]"#) {
        processor.process_input_object(row).unwrap();
    }
    assert_eq!(processor.finish().unwrap().columns, vec!["a", "b"]);

    let mut processor = TableProcessor::new();
    processor.add_table_middleware(Box::new(FlattenObjectMiddleware));
    processor.add_table_middleware(Box::new(SortColumnsMiddleware));
    for row in rows(r#"[{"a":1},{"a":1,"b":2}]"#) {
        processor.process_input_object(row).unwrap();
    }
    assert_eq!(processor.finish().unwrap().columns, vec!["a", "b"]);
}

#[test]
fn full_pipeline_renames_flattens_filters_sorts_and_pages() {
    let table = pipeline(
        &[
            "--rename",
            "nm:name",
            "--filter",
            "addr.zip",
            "--sort-by",
            "-age",
            "--skip",
            "1",
            "--limit",
            "1",
        ],
        r#"[
            {"nm":"ada","age":36,"addr":{"city":"london","zip":"n1"}},
            {"nm":"grace","age":85,"addr":{"city":"nyc","zip":"10001"}},
            {"nm":"alan","age":41,"addr":{"city":"wilmslow","zip":"sk9"}}
        ]"#,
    )
    .unwrap();
    assert_eq!(table.columns, vec!["name", "age", "addr.city"]);
    assert_eq!(column(&table, "name"), vec!["alan"]);
}

#[test]
fn fields_choose_and_order_columns_with_prefixes() {
    let table = pipeline(
        &["--fields", "addr.,name"],
        r#"[{"name":"ada","age":36,"addr":{"city":"london","zip":"n1"}}]"#,
    )
    .unwrap();
    assert_eq!(table.columns, vec!["addr.city", "addr.zip", "name"]);
}

#[test]
fn row_templates_see_flattened_names() {
    let table = pipeline(
        &[
            "--use-row-templates",
            "--template-field",
            "where:{{ name }}@{{ addr_city }}",
            "--output",
            "json",
        ],
        r#"[{"name":"ada","addr":{"city":"london"}}]"#,
    )
    .unwrap();
    assert_eq!(column(&table, "where"), vec!["ada@london"]);
    assert_eq!(table.columns.last().map(String::as_str), Some("where"));
}

#[test]
fn lone_template_replaces_each_record() {
    let table = pipeline(
        &["--template", "{{ uppercase(name) }}"],
        r#"[{"name":"ada"},{"name":"grace"}]"#,
    )
    .unwrap();
    assert_eq!(table.columns, vec!["_0"]);
    assert_eq!(column(&table, "_0"), vec!["ADA", "GRACE"]);
}

#[test]
fn template_failure_names_the_column() {
    let err = pipeline(
        &["--use-row-templates", "--template-field", "x:{{ missing }}"],
        r#"[{"name":"ada"}]"#,
    )
    .unwrap_err();
    let pipeline_err = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .expect("pipeline error in chain");
    match pipeline_err {
        PipelineError::Template { column, stage, .. } => {
            assert_eq!(column, "x");
            assert_eq!(*stage, "row-template");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn replace_file_flag_loads_rules() {
    let workspace = TestWorkspace::new();
    let rules = workspace.write(
        "replace.yaml",
        "level:\n  regex_skip: ['^trace$']\n  regex_replace:\n    - '^w.*': warn\n",
    );
    let table = pipeline(
        &["--replace-file", rules.to_str().unwrap()],
        r#"[{"level":"trace"},{"level":"wrn"},{"level":"info"}]"#,
    )
    .unwrap();
    assert_eq!(column(&table, "level"), vec!["warn", "info"]);
}

#[test]
fn malformed_regex_is_fatal() {
    let err = ReplaceMiddleware::from_yaml("f:\n  regex_skip: ['(']\n").unwrap_err();
    assert!(matches!(err, PipelineError::InvalidRegex { ref field, .. } if field == "f"));
}

fn column_names() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(prop_oneof!["[a-c]", "addr\\.[a-c]", "x\\.[a-b]"], 0..8).prop_map(
        |names| {
            let mut unique = Vec::new();
            for name in names {
                if !unique.contains(&name) {
                    unique.push(name);
                }
            }
            unique
        },
    )
}

fn order_spec() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(
        prop_oneof![
            Just("addr.".to_string()),
            Just("x.".to_string()),
            "[a-d]".prop_map(String::from),
        ],
        0..4,
    )
}

fn nested_row() -> impl Strategy<Value = Row> {
    proptest::collection::vec(("[a-d]", 0i64..10), 0..5).prop_map(|fields| {
        fields
            .into_iter()
            .map(|(key, value)| (key, Value::Integer(value)))
            .collect()
    })
}

proptest! {
    #[test]
    fn reorder_keeps_every_column_once_and_is_idempotent(
        existing in column_names(),
        order in order_spec(),
    ) {
        let once = reorder_columns(&existing, &order);
        let mut sorted_once = once.clone();
        sorted_once.sort();
        let mut sorted_existing = existing.clone();
        sorted_existing.sort();
        prop_assert_eq!(sorted_once, sorted_existing);
        prop_assert_eq!(reorder_columns(&once, &order), once.clone());

        if order.first().map(String::as_str) == Some("addr.") {
            let prefixed: Vec<&String> = existing.iter().filter(|c| c.starts_with("addr.")).collect();
            let leading: Vec<&String> = once.iter().take(prefixed.len()).collect();
            prop_assert_eq!(leading, prefixed);
        }
    }

    #[test]
    fn flatten_leaves_flat_rows_alone(row in nested_row()) {
        prop_assert_eq!(flatten_row(row.clone()), row);
    }
}
