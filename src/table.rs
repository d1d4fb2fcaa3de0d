//! Comma-delimited table codec for the task files.
//!
//! The format is one header line naming the columns, then one line per
//! row. A field is quoted with double quotes exactly when it contains a
//! comma, a quote, or a newline; a literal quote inside a quoted field
//! is doubled, and a quoted field may span physical lines. Empty cells
//! are kept, so `parse` and `serialize` round-trip any field values.

use std::collections::HashMap;

/// One row keyed by header name.
pub type Row = HashMap<String, String>;

/// A record the parser had to skip, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub line: usize,
    pub message: String,
}

/// Parse output: column names in file order, rows in file order, and
/// any skipped records for the caller to log.
#[derive(Debug, Default)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub skipped: Vec<ParseDiagnostic>,
}

/// Parse a whole table. The first non-blank record is the header line;
/// header names are trimmed, field values are kept verbatim. Rows
/// shorter than the header are padded with empty strings and extra
/// cells are dropped.
pub fn parse(text: &str) -> ParsedTable {
    let mut table = ParsedTable::default();
    let (records, unterminated) = split_records(text);
    if let Some(line) = unterminated {
        table.skipped.push(ParseDiagnostic {
            line,
            message: "unterminated quoted field".to_string(),
        });
    }
    let mut nonblank = records
        .into_iter()
        .filter(|(_, record)| !record.trim().is_empty());
    let Some((_, header_line)) = nonblank.next() else {
        return table;
    };
    table.headers = split_fields(&header_line)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    for (_, record) in nonblank {
        let cells = split_fields(&record);
        let mut row = Row::new();
        for (i, header) in table.headers.iter().enumerate() {
            row.insert(header.clone(), cells.get(i).cloned().unwrap_or_default());
        }
        table.rows.push(row);
    }
    table
}

/// Serialize rows under the given column order, ending with a trailing
/// newline. Cells missing from a row are written as empty.
pub fn serialize<S: AsRef<str>>(rows: &[Row], headers: &[S]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| h.as_ref())
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| encode_field(row.get(h.as_ref()).map(String::as_str).unwrap_or("")))
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n") + "\n"
}

/// Split text into records, honoring quotes so a quoted field can span
/// physical lines. Returns the records with their 1-based starting
/// line numbers, plus the starting line of a trailing unterminated
/// record, if any, which is dropped.
fn split_records(text: &str) -> (Vec<(usize, String)>, Option<usize>) {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut start = 1usize;
    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '\n' if !in_quotes => {
                if current.ends_with('\r') {
                    current.pop();
                }
                records.push((start, std::mem::take(&mut current)));
                line += 1;
                start = line;
            }
            '\n' => {
                current.push(c);
                line += 1;
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        return (records, Some(start));
    }
    if !current.is_empty() {
        records.push((start, current));
    }
    (records, None)
}

/// Split one record into fields. A doubled quote inside a quoted field
/// is an escaped literal quote.
fn split_fields(record: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = record.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }
    fields.push(current);
    fields
}

/// Quote a field iff it contains a delimiter, a quote, or a newline.
fn encode_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
