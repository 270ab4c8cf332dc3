//! Fixed-width text drawing for the `table` output format.

use std::{borrow::Cow, fmt::Write as _};

use crate::{data::Value, rows::Table};

const GUTTER: &str = "  ";
const MIN_RULE: usize = 3;

struct Cell {
    text: String,
    numeric: bool,
}

fn cell_for(value: Option<&Value>) -> Cell {
    match value {
        Some(value @ (Value::Integer(_) | Value::Float(_))) => Cell {
            text: value.as_display(),
            numeric: true,
        },
        Some(value) => Cell {
            text: single_line(&value.as_display()).into_owned(),
            numeric: false,
        },
        None => Cell {
            text: String::new(),
            numeric: false,
        },
    }
}

/// Draws a header, a dashed rule and one line per row. Numbers are right-aligned.
pub fn render_table(table: &Table) -> String {
    let grid: Vec<Vec<Cell>> = table
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .map(|column| cell_for(row.get(column)))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = table
        .columns
        .iter()
        .map(|column| display_width(column).max(MIN_RULE))
        .collect();
    for line in &grid {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(display_width(&cell.text));
        }
    }

    let mut output = String::new();
    let header: Vec<Cell> = table
        .columns
        .iter()
        .map(|column| Cell {
            text: single_line(column).into_owned(),
            numeric: false,
        })
        .collect();
    push_line(&mut output, &header, &widths);
    let rule: Vec<Cell> = widths
        .iter()
        .map(|width| Cell {
            text: "-".repeat(*width),
            numeric: false,
        })
        .collect();
    push_line(&mut output, &rule, &widths);
    for line in &grid {
        push_line(&mut output, line, &widths);
    }
    output
}

fn push_line(output: &mut String, cells: &[Cell], widths: &[usize]) {
    let mut line = String::new();
    for (idx, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str(GUTTER);
        }
        let padding = " ".repeat(width.saturating_sub(display_width(&cell.text)));
        if cell.numeric {
            line.push_str(&padding);
            line.push_str(&cell.text);
        } else {
            line.push_str(&cell.text);
            line.push_str(&padding);
        }
    }
    let _ = writeln!(output, "{}", line.trim_end());
}

/// Counts characters, ignoring ANSI colour sequences.
fn display_width(value: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for ch in value.chars() {
        match (in_escape, ch) {
            (false, '\u{1b}') => in_escape = true,
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, _) => width += 1,
        }
    }
    width
}

fn single_line(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
