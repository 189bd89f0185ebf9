//! boxscore Test Utilities
//!
//! Shared test infrastructure for the boxscore workspace:
//! - A scripted [`MockUpstream`] that counts calls per URL
//! - HTML and JSON fixtures shaped like the real upstream documents
//! - Proptest generators for table extraction
//! - Assertions for boxscore error variants

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub use boxscore_core::{BoxscoreError, BoxscoreResult, ExtractError, FetchError, Upstream};

// ============================================================================
// MOCK UPSTREAM
// ============================================================================

/// Canned answer for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Json(Value),
    Html(String),
    Status(u16),
}

/// In-memory [`Upstream`] with per-URL responses and call counters.
///
/// URLs without a scripted response answer with status 404. An optional
/// latency is applied to every call through the tokio clock, so tests using
/// paused time stay deterministic.
#[derive(Debug, Default)]
pub struct MockUpstream {
    responses: Mutex<HashMap<String, MockResponse>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Option<Duration>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn respond_json(&self, url: impl Into<String>, body: Value) -> &Self {
        self.respond(url, MockResponse::Json(body))
    }

    pub fn respond_html(&self, url: impl Into<String>, body: impl Into<String>) -> &Self {
        self.respond(url, MockResponse::Html(body.into()))
    }

    pub fn respond_status(&self, url: impl Into<String>, status: u16) -> &Self {
        self.respond(url, MockResponse::Status(status))
    }

    pub fn respond(&self, url: impl Into<String>, response: MockResponse) -> &Self {
        lock(&self.responses).insert(url.into(), response);
        self
    }

    /// Number of calls made for `url` so far.
    pub fn calls(&self, url: &str) -> usize {
        lock(&self.calls).get(url).copied().unwrap_or(0)
    }

    /// Number of calls across all URLs.
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    async fn answer(&self, url: &str) -> MockResponse {
        *lock(&self.calls).entry(url.to_string()).or_insert(0) += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        lock(&self.responses)
            .get(url)
            .cloned()
            .unwrap_or(MockResponse::Status(404))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        match self.answer(url).await {
            MockResponse::Json(value) => Ok(value),
            MockResponse::Html(body) => serde_json::from_str(&body).map_err(|e| FetchError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            MockResponse::Status(status) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        match self.answer(url).await {
            MockResponse::Json(value) => Ok(value.to_string()),
            MockResponse::Html(body) => Ok(body),
            MockResponse::Status(status) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Upstream documents trimmed down to the parts the service reads.

    use serde_json::{json, Value};

    /// An AP poll page with a hidden span in the title and a single table.
    pub fn rankings_html() -> String {
        r#"<!DOCTYPE html>
<html>
<head><title>College football rankings: AP Top 25 | NCAA.com</title></head>
<body>
  <h2 class="page-title">Football</h2>
  <main>
    <h1 class="node__title">Associated Press<span class="hidden"> (AP) Top 25</span></h1>
    <div class="rankings-last-updated">Last Updated Sept. 3, 2024</div>
    <table class="sticky">
      <thead>
        <tr><th>RANK</th><th>SCHOOL</th><th>POINTS</th><th>PREVIOUS</th><th>RECORD</th></tr>
      </thead>
      <tbody>
        <tr><td>1</td><td>Georgia (62)</td><td>1550</td><td>1</td><td>1-0</td></tr>
        <tr><td>2</td><td>Texas</td><td>1469</td><td>4</td><td>1-0</td></tr>
        <tr><td>3</td><td>Ohio State</td><td>1462</td><td>2</td><td>1-0</td></tr>
      </tbody>
    </table>
  </main>
</body>
</html>"#
            .to_string()
    }

    /// A paginated individual stats page, currently on page 2 of 3.
    pub fn stats_html() -> String {
        r#"<html>
<head><title>Individual Statistics | NCAA.com</title></head>
<body>
  <h2 class="page-title">Football</h2>
  <main>
    <div class="stats-header__lower__title">Passing Yards Per Game</div>
    <div class="stats-header__lower__desc">Last updated Monday, November 04, 2024 08:00 am - ET</div>
    <table>
      <thead><tr><th>Rank</th><th>Name</th><th>Team</th><th>YPG</th></tr></thead>
      <tbody>
        <tr><td>51</td><td>Kyle McCord</td><td>Syracuse</td><td>220.1</td></tr>
      </tbody>
    </table>
    <ul class="stats-pager">
      <li class="stats-pager__li--prev"><a>prev</a></li>
      <li><a>1</a></li>
      <li class="active"><a>2</a></li>
      <li><a>3</a></li>
      <li class="stats-pager__li--next"><a>next</a></li>
    </ul>
  </main>
</body>
</html>"#
            .to_string()
    }

    /// A two-conference standings page with merged headers.
    pub fn standings_html() -> String {
        r#"<html>
<head><title>Standings | NCAA.com</title></head>
<body>
  <h2 class="page-title">Basketball</h2>
  <main>
    <div class="standings-last-updated">Last updated 03/10/2024</div>
    <table class="standings-legend"><tbody></tbody></table>
    <h3 class="standings-conference">America East</h3>
    <table class="standings-table">
      <thead>
        <tr class="standings-table-header">
          <th>School</th><th colspan="2">Conference</th><th colspan="2">Non-Conf</th>
        </tr>
        <tr class="standings-table-subheader">
          <th></th><th>W</th><th>L</th><th>W</th><th>L</th>
        </tr>
      </thead>
      <tbody>
        <tr><td>Vermont</td><td>15</td><td>1</td><td>13</td><td>6</td></tr>
        <tr><td>UMass Lowell</td><td>11</td><td>5</td><td>10</td><td>7</td></tr>
      </tbody>
    </table>
    <h3 class="standings-conference">Big Ten</h3>
    <table class="standings-table">
      <thead>
        <tr class="standings-table-header">
          <th>School</th><th colspan="2">Conference</th><th colspan="2">Non-Conf</th>
        </tr>
        <tr class="standings-table-subheader">
          <th></th><th>W</th><th>L</th><th>W</th><th>L</th>
        </tr>
      </thead>
      <tbody>
        <tr class="subdiv-header"><td colspan="5">West</td></tr>
        <tr><td>Purdue</td><td>17</td><td>3</td><td>12</td><td>1</td></tr>
      </tbody>
    </table>
  </main>
</body>
</html>"#
            .to_string()
    }

    /// `today.json` pointing at a calendar day.
    pub fn today_json(date: &str) -> Value {
        json!({ "today": date })
    }

    /// A legacy `scoreboard.json` with one final game.
    pub fn legacy_scoreboard_json() -> Value {
        json!({
            "inputMD5Sum": "4b1e0b1a1c4d8d8c2e2c6a1b44f6d0a1",
            "updated_at": "2024-06-24 21:14:02",
            "games": [{
                "game": {
                    "gameID": "3146430",
                    "gameState": "final",
                    "title": "Tennessee Texas A&M",
                    "home": { "score": "6", "names": { "short": "Texas A&M" }, "winner": false },
                    "away": { "score": "9", "names": { "short": "Tennessee" }, "winner": true }
                }
            }]
        })
    }

    /// A legacy `scoreboard.json` for the same day as [`contests_json`], with
    /// short names in a different case and an unrelated one-sided game.
    pub fn legacy_enrichment_json() -> Value {
        json!({
            "games": [
                { "game": { "home": { "names": { "short": "Other" } } } },
                {
                    "game": {
                        "network": "ABC",
                        "home": {
                            "names": { "short": "lsu", "full": "Louisiana State University" },
                            "description": "(1-0)",
                            "conferences": [{ "conferenceName": "SEC", "conferenceSeo": "sec" }]
                        },
                        "away": {
                            "names": { "short": "CLEMSON", "full": "Clemson University" },
                            "description": "(0-1)",
                            "conferences": [{ "conferenceName": "ACC", "conferenceSeo": "acc" }]
                        }
                    }
                }
            ]
        })
    }

    /// A GraphQL contests response with one complete and one one-sided contest.
    pub fn contests_json() -> Value {
        json!({
            "data": {
                "contests": [
                    {
                        "contestId": 6308711,
                        "startDate": "08/30/2025",
                        "startTime": "19:30",
                        "startTimeEpoch": "1756596600",
                        "gameState": "F",
                        "finalMessage": "FINAL",
                        "url": "/game/6308711",
                        "broadcasterName": "ESPN",
                        "liveVideos": [],
                        "currentPeriod": "FINAL",
                        "contestClock": null,
                        "teams": [
                            { "isHome": true, "isWinner": true, "score": 38, "nameShort": "LSU",
                              "name6Char": "LSU", "seoname": "lsu", "teamRank": 9,
                              "conferenceSeo": "sec" },
                            { "isHome": false, "isWinner": false, "score": 17, "nameShort": "Clemson",
                              "name6Char": "CLEM", "seoname": "clemson", "seed": null,
                              "conferenceSeo": "acc" }
                        ]
                    },
                    {
                        "contestId": "6308712",
                        "gameState": "P",
                        "teams": [
                            { "isHome": true, "isWinner": false, "nameShort": "Solo" }
                        ]
                    }
                ]
            }
        })
    }

    /// The upstream school list with untrimmed names.
    pub fn schools_json() -> Value {
        json!([
            { "slug": "air-force", "name": " Air Force ", "long_name": "U.S. Air Force Academy " },
            { "slug": "akron", "name": "Akron", "long_name": " University of Akron" }
        ])
    }

    /// A game-center GraphQL response.
    pub fn game_json(id: &str) -> Value {
        json!({
            "data": {
                "contests": [{ "id": id, "gameState": "F", "finalMessage": "FINAL" }]
            }
        })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for table extraction.

    use boxscore_extract::SpanningCell;
    use proptest::prelude::*;

    /// A non-empty column label without markup characters.
    pub fn arb_label() -> impl Strategy<Value = String> {
        "[A-Z][A-Za-z0-9]{0,7}"
    }

    /// Cell text, possibly empty.
    pub fn arb_cell() -> impl Strategy<Value = String> {
        "[A-Za-z0-9.\\-]{0,10}"
    }

    /// A first header row with colspans between 1 and 3.
    pub fn arb_spanning_row() -> impl Strategy<Value = Vec<SpanningCell>> {
        prop::collection::vec(
            (arb_label(), 1usize..=3).prop_map(|(label, colspan)| SpanningCell::new(label, colspan)),
            1..5,
        )
    }

    /// A pair of header rows where the second row has exactly one cell per
    /// physical column of the first.
    pub fn arb_aligned_header_rows() -> impl Strategy<Value = (Vec<SpanningCell>, Vec<String>)> {
        arb_spanning_row().prop_flat_map(|row_one| {
            let width: usize = row_one.iter().map(|cell| cell.colspan).sum();
            (
                Just(row_one),
                prop::collection::vec(prop_oneof![Just(String::new()), arb_label()], width),
            )
        })
    }

    /// A header of `width` distinct labels and rows of arbitrary length.
    pub fn arb_table(width: usize) -> impl Strategy<Value = (Vec<String>, Vec<Vec<String>>)> {
        let header: Vec<String> = (0..width).map(|i| format!("COL{}", i)).collect();
        (
            Just(header),
            prop::collection::vec(prop::collection::vec(arb_cell(), 0..width + 3), 0..6),
        )
    }

    /// Render a single-header table inside `<main>`.
    pub fn render_table(header: &[String], rows: &[Vec<String>]) -> String {
        let mut out = String::from("<main><table><thead><tr>");
        for label in header {
            out.push_str(&format!("<th>{}</th>", label));
        }
        out.push_str("</tr></thead><tbody>");
        for row in rows {
            out.push_str("<tr>");
            for cell in row {
                out.push_str(&format!("<td>{}</td>", cell));
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table></main>");
        out
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for boxscore error variants.

    use super::*;

    /// Assert that a result failed with an upstream status.
    #[track_caller]
    pub fn assert_fetch_status<T: std::fmt::Debug>(result: &BoxscoreResult<T>, expected: u16) {
        match result {
            Err(BoxscoreError::Fetch(FetchError::Status { status, .. })) => {
                assert_eq!(*status, expected, "Wrong upstream status");
            }
            other => panic!("Expected upstream status {}, got: {:?}", expected, other),
        }
    }

    /// Assert that a result failed during extraction.
    #[track_caller]
    pub fn assert_extract_error<T: std::fmt::Debug>(result: &BoxscoreResult<T>) {
        match result {
            Err(BoxscoreError::Extract(_)) => {}
            other => panic!("Expected Extract error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
