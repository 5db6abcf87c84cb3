//! Output formatting
//!
//! Renders result sets in a handful of compact textual shapes. Every record
//! type knows its identifying field and its one-line summary; table and
//! markdown renderings are optional and fall back to the summary.

use crate::Result;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::ValueEnum;
use serde::Serialize;

/// Rendered for an empty result set, in every mode
pub const NO_RESULTS: &str = "No results found";

/// Rendering mode selected with `--format`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One dense line per record
    #[default]
    Summary,
    /// Pretty-printed JSON
    Full,
    /// Identifying field only, one per line
    Ids,
    /// Same as `ids`, named for issue keys
    Keys,
    /// Tab-separated header and rows
    Table,
    /// Page body as plain text
    Markdown,
}

/// Modes for plain result lists
pub const LIST_FORMATS: &[Format] = &[Format::Summary, Format::Full, Format::Ids];
/// Modes for issue search results
pub const ISSUE_FORMATS: &[Format] = &[Format::Summary, Format::Full, Format::Table, Format::Keys];
/// Modes for a single record
pub const SINGLE_FORMATS: &[Format] = &[Format::Summary, Format::Full];
/// Modes for a single page with a body
pub const PAGE_FORMATS: &[Format] = &[Format::Summary, Format::Full, Format::Markdown];

/// `--format` parser that only accepts the modes in `allowed`
pub fn format_parser(allowed: &'static [Format]) -> impl TypedValueParser<Value = Format> {
    PossibleValuesParser::new(allowed.iter().filter_map(|format| format.to_possible_value()))
        .map(|name| <Format as ValueEnum>::from_str(&name, true).unwrap_or_default())
}

/// A renderable result record
pub trait Record: Serialize {
    /// Value printed in `ids`/`keys` mode
    fn key(&self) -> String;

    fn summary_line(&self) -> String;

    /// Column header for `table` mode; `None` falls back to summary
    fn table_header() -> Option<&'static str> {
        None
    }

    fn table_row(&self) -> String {
        self.summary_line()
    }

    /// Body for `markdown` mode; `None` falls back to summary
    fn markdown(&self) -> Option<String> {
        None
    }
}

/// Render a list of records
pub fn format_list<R: Record>(records: &[R], format: Format) -> Result<String> {
    if records.is_empty() {
        return Ok(NO_RESULTS.to_string());
    }

    let rendered = match format {
        Format::Full => serde_json::to_string_pretty(records)?,
        Format::Ids | Format::Keys => join_lines(records.iter().map(Record::key)),
        Format::Table => match R::table_header() {
            Some(header) => join_lines(
                std::iter::once(header.to_string()).chain(records.iter().map(Record::table_row)),
            ),
            None => summary(records),
        },
        Format::Markdown => join_lines(
            records
                .iter()
                .map(|record| record.markdown().unwrap_or_else(|| record.summary_line())),
        ),
        Format::Summary => summary(records),
    };

    Ok(rendered)
}

/// Render a single record (`full` prints the object, not a one-element list)
pub fn format_one<R: Record>(record: &R, format: Format) -> Result<String> {
    match format {
        Format::Full => Ok(serde_json::to_string_pretty(record)?),
        _ => format_list(std::slice::from_ref(record), format),
    }
}

/// Cut `text` to `max` characters, appending `...` when something was removed
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str("...");
    cut
}

/// First `max` characters without a marker (table cells, date prefixes)
pub fn prefix(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn summary<R: Record>(records: &[R]) -> String {
    join_lines(records.iter().map(Record::summary_line))
}

fn join_lines(lines: impl Iterator<Item = String>) -> String {
    lines.collect::<Vec<_>>().join("\n")
}
