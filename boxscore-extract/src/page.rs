//! Whole-page extraction for scraped stats, rankings, standings and history.

use boxscore_core::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use serde::Serialize;

use crate::record::Record;
use crate::table::{extract_table, selector, text_of};

const MAIN_TABLE: &str = "main table";
const SPORT: &str = "h2.page-title";
const TITLE: &str = ".stats-header__lower__title, main option[selected], main h1.node__title";
const UPDATED: &str = ".stats-header__lower__desc, .rankings-last-updated, .standings-last-updated";
const PAGER_ITEMS: &str =
    "ul.stats-pager li:not(.stats-pager__li--prev):not(.stats-pager__li--next)";
const CONFERENCE: &str = ".standings-conference";

static LAST_UPDATED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)last updated ").expect("Invalid last-updated regex"));

/// Which body a scraped page carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// A single `main table`.
    Table,
    /// One table per conference, each preceded by a `.standings-conference`
    /// heading.
    Standings,
}

/// A conference heading and the table that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub conference: String,
    pub standings: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageData {
    Table(Vec<Record>),
    Sections(Vec<Section>),
}

/// Response envelope for a scraped page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapedPage {
    pub sport: String,
    pub title: String,
    pub updated: String,
    pub page: u32,
    pub pages: u32,
    pub data: PageData,
}

/// Parse `html` and extract its envelope and table data.
///
/// A document without a `main table` is an error rather than an empty
/// result, since it means the page layout changed.
pub fn extract_page(html: &str, kind: PageKind) -> Result<ScrapedPage, ExtractError> {
    let document = Html::parse_document(html);

    let table = document
        .select(&selector(MAIN_TABLE)?)
        .next()
        .ok_or_else(|| ExtractError::MissingElement {
            selector: MAIN_TABLE.to_string(),
        })?;

    let sport = document
        .select(&selector(SPORT)?)
        .next()
        .map(text_of)
        .unwrap_or_default();

    let title = match document.select(&selector(TITLE)?).next() {
        Some(element) => visible_text(element),
        None => match kind {
            PageKind::Standings => "ALL CONFERENCES".to_string(),
            PageKind::Table => document_title(&document)?,
        },
    };

    let updated = document
        .select(&selector(UPDATED)?)
        .next()
        .map(|element| {
            let text: String = element.text().collect();
            LAST_UPDATED_PREFIX.replace(&text, "").trim().to_string()
        })
        .unwrap_or_default();

    let (page, pages) = pager(&document)?;

    let data = match kind {
        PageKind::Table => PageData::Table(extract_table(table)?),
        PageKind::Standings => PageData::Sections(standings_sections(&document)?),
    };

    Ok(ScrapedPage {
        sport,
        title,
        updated,
        page,
        pages,
        data,
    })
}

/// Trimmed text of `element`, leaving out anything under a `.hidden` element.
fn visible_text(element: ElementRef<'_>) -> String {
    fn collect(element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(inner) => {
                    if inner.classes().any(|class| class == "hidden") {
                        continue;
                    }
                    if let Some(child) = ElementRef::wrap(child) {
                        collect(child, out);
                    }
                }
                _ => {}
            }
        }
    }

    let mut out = String::new();
    collect(element, &mut out);
    out.trim().to_string()
}

/// `<title>` text up to the first " |".
fn document_title(document: &Html) -> Result<String, ExtractError> {
    let title = document
        .select(&selector("title")?)
        .next()
        .map(|element| element.text().collect::<String>())
        .unwrap_or_default();
    Ok(title
        .split(" |")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}

/// Current page (1-based) and page count from the stats pager.
///
/// No pager means a single page. A pager with no active item reports page 1.
fn pager(document: &Html) -> Result<(u32, u32), ExtractError> {
    let items: Vec<ElementRef<'_>> = document.select(&selector(PAGER_ITEMS)?).collect();
    if items.is_empty() {
        return Ok((1, 1));
    }

    let active = items
        .iter()
        .position(|li| li.value().classes().any(|class| class == "active"))
        .unwrap_or(0);

    Ok((active as u32 + 1, items.len() as u32))
}

fn standings_sections(document: &Html) -> Result<Vec<Section>, ExtractError> {
    document
        .select(&selector(CONFERENCE)?)
        .map(|heading| -> Result<Section, ExtractError> {
            let conference = text_of(heading);
            let table = heading
                .next_siblings()
                .find_map(ElementRef::wrap)
                .filter(|sibling| sibling.value().name() == "table")
                .ok_or_else(|| ExtractError::OrphanSection {
                    section: conference.clone(),
                })?;
            Ok(Section {
                conference,
                standings: extract_table(table)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANKINGS: &str = r#"<html><head><title>College football rankings | NCAA.com</title></head>
        <body>
          <h2 class="page-title"> Football </h2>
          <main>
            <h1 class="node__title">Associated Press <span class="hidden">Top 25</span></h1>
            <div class="rankings-last-updated">Last Updated Sept. 3, 2024</div>
            <table>
              <thead><tr><th>RANK</th><th>SCHOOL</th><th>POINTS</th></tr></thead>
              <tbody>
                <tr><td>1</td><td>Georgia (62)</td><td>1550</td></tr>
                <tr><td>2</td><td>Texas</td><td>1469</td></tr>
              </tbody>
            </table>
          </main>
        </body></html>"#;

    #[test]
    fn test_rankings_page_envelope() {
        let page = extract_page(RANKINGS, PageKind::Table).unwrap();
        assert_eq!(page.sport, "Football");
        assert_eq!(page.title, "Associated Press");
        assert_eq!(page.updated, "Sept. 3, 2024");
        assert_eq!((page.page, page.pages), (1, 1));

        let PageData::Table(records) = &page.data else {
            panic!("expected table data");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("SCHOOL"), Some("Texas"));
    }

    #[test]
    fn test_page_serializes_records_in_column_order() {
        let page = extract_page(RANKINGS, PageKind::Table).unwrap();
        let json = serde_json::to_string(&page).unwrap();
        assert!(json.contains(r#""data":[{"RANK":"1","SCHOOL":"Georgia (62)","POINTS":"1550"},"#));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let err = extract_page("<html><main><p>Maintenance</p></main></html>", PageKind::Table)
            .unwrap_err();
        assert_eq!(
            err,
            ExtractError::MissingElement {
                selector: "main table".to_string()
            }
        );
    }

    #[test]
    fn test_empty_table_is_an_empty_result() {
        let page = extract_page(
            "<main><table><thead><tr><th>A</th></tr></thead><tbody></tbody></table></main>",
            PageKind::Table,
        )
        .unwrap();
        assert_eq!(page.data, PageData::Table(Vec::new()));
    }

    #[test]
    fn test_title_falls_back_to_document_title() {
        let page = extract_page(
            "<html><head><title>Individual Statistics | NCAA.com</title></head>
             <body><main><table></table></main></body></html>",
            PageKind::Table,
        )
        .unwrap();
        assert_eq!(page.title, "Individual Statistics");
        assert_eq!(page.updated, "");
    }

    #[test]
    fn test_pager_reports_active_page() {
        let page = extract_page(
            r#"<main>
                <ul class="stats-pager">
                  <li class="stats-pager__li--prev">prev</li>
                  <li>1</li><li class="active">2</li><li>3</li>
                  <li class="stats-pager__li--next">next</li>
                </ul>
                <table><thead><tr><th>A</th></tr></thead><tbody></tbody></table>
            </main>"#,
            PageKind::Table,
        )
        .unwrap();
        assert_eq!((page.page, page.pages), (2, 3));
    }

    #[test]
    fn test_standings_sections() {
        let html = r#"<main>
            <div class="standings-last-updated">Last updated 11/02/2024</div>
            <h3 class="standings-conference">ACC</h3>
            <table>
              <thead>
                <tr class="standings-table-header"><th>School</th><th colspan="2">Conference</th></tr>
                <tr class="standings-table-subheader"><th></th><th>W</th><th>L</th></tr>
              </thead>
              <tbody><tr><td>Miami</td><td>5</td><td>0</td></tr></tbody>
            </table>
            <h3 class="standings-conference">Big Ten</h3>
            <table>
              <thead>
                <tr class="standings-table-header"><th>School</th><th colspan="2">Conference</th></tr>
                <tr class="standings-table-subheader"><th></th><th>W</th><th>L</th></tr>
              </thead>
              <tbody><tr><td>Oregon</td><td>6</td><td>0</td></tr></tbody>
            </table>
        </main>"#;

        let page = extract_page(html, PageKind::Standings).unwrap();
        assert_eq!(page.title, "ALL CONFERENCES");
        assert_eq!(page.updated, "11/02/2024");

        let PageData::Sections(sections) = &page.data else {
            panic!("expected sections");
        };
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].conference, "Big Ten");
        assert_eq!(sections[1].standings[0].get("Conference W"), Some("6"));

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["data"][0]["conference"], "ACC");
        assert_eq!(json["data"][0]["standings"][0]["School"], "Miami");
    }

    #[test]
    fn test_section_without_table_is_an_error() {
        let html = r#"<main>
            <table><tbody></tbody></table>
            <h3 class="standings-conference">SEC</h3>
            <p>coming soon</p>
        </main>"#;
        let err = extract_page(html, PageKind::Standings).unwrap_err();
        assert_eq!(
            err,
            ExtractError::OrphanSection {
                section: "SEC".to_string()
            }
        );
    }

    #[test]
    fn test_extract_page_is_idempotent() {
        assert_eq!(
            extract_page(RANKINGS, PageKind::Table).unwrap(),
            extract_page(RANKINGS, PageKind::Table).unwrap()
        );
    }
}
