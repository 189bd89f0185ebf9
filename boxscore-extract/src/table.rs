//! Table-to-record extraction.
//!
//! A table is turned into one [`Record`] per data row. Column labels come
//! either from a single header row or from two header rows whose first row
//! spans several physical columns via `colspan`.

use boxscore_core::ExtractError;
use scraper::{ElementRef, Selector};

use crate::record::Record;

const HEADER_ROW: &str = ".standings-table-header";
const SUBHEADER_ROW: &str = ".standings-table-subheader";

/// Parse a CSS selector, reporting failures as extraction errors.
pub(crate) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Trimmed text content of an element and all its descendants.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// How a table's column labels are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// One `thead` row, one label per column.
    Single,
    /// A spanning header row followed by a subheader row.
    Merged,
}

impl HeaderLayout {
    /// Merged iff the table contains a subheader row.
    pub fn detect(table: ElementRef<'_>) -> Result<Self, ExtractError> {
        let subheader = selector(SUBHEADER_ROW)?;
        if table.select(&subheader).next().is_some() {
            Ok(Self::Merged)
        } else {
            Ok(Self::Single)
        }
    }
}

/// A first-row header cell and the number of physical columns it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanningCell {
    pub label: String,
    pub colspan: usize,
}

impl SpanningCell {
    pub fn new(label: impl Into<String>, colspan: usize) -> Self {
        Self {
            label: label.into(),
            colspan,
        }
    }
}

/// `colspan` attribute value; missing, malformed or zero means 1.
fn colspan_of(cell: ElementRef<'_>) -> usize {
    cell.value()
        .attr("colspan")
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|span| *span > 0)
        .unwrap_or(1)
}

/// Flatten two header rows into one label per physical column.
///
/// Row one is expanded by colspan; row two's label at each index is appended
/// to row one's after a space. An empty row-two label leaves row one's as is.
/// Columns past the end of either row take the other row's label alone.
pub fn merge_header_rows(row_one: &[SpanningCell], row_two: &[String]) -> Vec<String> {
    let expanded: Vec<&str> = row_one
        .iter()
        .flat_map(|cell| std::iter::repeat(cell.label.as_str()).take(cell.colspan))
        .collect();

    let width = expanded.len().max(row_two.len());
    (0..width)
        .map(|i| {
            let top = expanded.get(i).copied().unwrap_or("");
            let bottom = row_two.get(i).map(String::as_str).unwrap_or("");
            match (top.is_empty(), bottom.is_empty()) {
                (_, true) => top.to_string(),
                (true, false) => bottom.to_string(),
                (false, false) => format!("{} {}", top, bottom),
            }
        })
        .collect()
}

/// Assign cells to labels by position.
///
/// Cells past the last label, or whose label is empty, are dropped. Labels
/// past the last cell are simply absent from the record.
pub fn align_row<I, S>(labels: &[String], cells: I) -> Record
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut record = Record::new();
    for (label, cell) in labels.iter().zip(cells) {
        if !label.is_empty() {
            record.insert(label.clone(), cell);
        }
    }
    record
}

/// Column labels of `table` under `layout`.
pub fn column_labels(
    table: ElementRef<'_>,
    layout: HeaderLayout,
) -> Result<Vec<String>, ExtractError> {
    let th = selector("th")?;
    match layout {
        HeaderLayout::Single => {
            let header_cells = selector("thead th")?;
            Ok(table.select(&header_cells).map(text_of).collect())
        }
        HeaderLayout::Merged => {
            let row_one = table
                .select(&selector(HEADER_ROW)?)
                .next()
                .ok_or_else(|| ExtractError::MissingElement {
                    selector: HEADER_ROW.to_string(),
                })?;
            let row_two = table
                .select(&selector(SUBHEADER_ROW)?)
                .next()
                .ok_or_else(|| ExtractError::MissingElement {
                    selector: SUBHEADER_ROW.to_string(),
                })?;

            let spanning: Vec<SpanningCell> = row_one
                .select(&th)
                .map(|cell| SpanningCell::new(text_of(cell), colspan_of(cell)))
                .collect();
            let sub: Vec<String> = row_two.select(&th).map(text_of).collect();

            Ok(merge_header_rows(&spanning, &sub))
        }
    }
}

/// Extract every data row of `table`, detecting the header layout.
///
/// Rows marked `subdiv-header` are section dividers and are skipped. A table
/// with headers but no data rows yields an empty list.
pub fn extract_table(table: ElementRef<'_>) -> Result<Vec<Record>, ExtractError> {
    let layout = HeaderLayout::detect(table)?;
    let labels = column_labels(table, layout)?;

    let rows = selector("tbody tr:not(.subdiv-header)")?;
    let td = selector("td")?;

    Ok(table
        .select(&rows)
        .map(|row| align_row(&labels, row.select(&td).map(text_of)))
        .collect())
}
