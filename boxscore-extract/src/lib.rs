//! boxscore Extract - HTML Table Extraction
//!
//! Turns scraped stats, rankings, standings and history pages into JSON-ready
//! records. Everything here is synchronous: a parsed [`scraper::Html`] is not
//! `Send`, so callers parse and extract in one step and only hold the
//! resulting [`ScrapedPage`] across await points.

pub mod page;
pub mod record;
pub mod table;

pub use page::{extract_page, PageData, PageKind, ScrapedPage, Section};
pub use record::Record;
pub use table::{
    align_row, column_labels, extract_table, merge_header_rows, HeaderLayout, SpanningCell,
};
