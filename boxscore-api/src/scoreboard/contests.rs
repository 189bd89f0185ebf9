//! Contests GraphQL query and its conversion to the legacy scoreboard shape.
//!
//! Clients were built against `scoreboard.json`. Contest responses are read
//! into the loosely typed structs below and immediately rebuilt as
//! [`LegacyScoreboard`], so the GraphQL shape never reaches a client.
//!
//! A few legacy fields (full names, conference names, descriptions) have no
//! contests counterpart. Where the legacy document still exists for the same
//! day it is read alongside and matched game by game.

use std::fmt;

use boxscore_core::{BoxscoreResult, FetchError, Upstream};
use chrono::{NaiveDateTime, NaiveTime};
use futures_util::future::try_join_all;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::upstream::UpstreamUrls;

/// Football weeks that together make up the playoff bracket.
pub const PLAYOFF_WEEKS: [u32; 5] = [16, 17, 18, 19, 20];

// ============================================================================
// QUERY
// ============================================================================

/// Variables of one contests query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestQuery {
    pub sport_code: &'static str,
    pub division: u8,
    pub season_year: i32,
    /// `MM/DD/YYYY`
    pub contest_date: Option<String>,
    pub week: Option<u32>,
}

impl ContestQuery {
    /// Query variables. Absent optional fields are left out rather than
    /// sent as null.
    pub fn variables(&self) -> Value {
        let mut vars = Map::new();
        vars.insert("sportCode".into(), Value::from(self.sport_code));
        vars.insert("division".into(), Value::from(self.division));
        vars.insert("seasonYear".into(), Value::from(self.season_year));
        if let Some(date) = &self.contest_date {
            vars.insert("contestDate".into(), Value::from(date.as_str()));
        }
        if let Some(week) = self.week {
            vars.insert("week".into(), Value::from(week));
        }
        Value::Object(vars)
    }
}

/// Run every query and concatenate their contests in query order.
pub async fn fetch_contests(
    upstream: &dyn Upstream,
    urls: &UpstreamUrls,
    queries: &[ContestQuery],
) -> BoxscoreResult<Vec<Contest>> {
    let responses = try_join_all(queries.iter().map(|query| async move {
        let url = urls.contests(&query.variables());
        let body = upstream.get_json(&url).await?;
        serde_json::from_value::<ContestsResponse>(body).map_err(|e| FetchError::Decode {
            url,
            reason: e.to_string(),
        })
    }))
    .await?;

    Ok(responses
        .into_iter()
        .flat_map(|response| {
            response
                .data
                .and_then(|data| data.contests)
                .unwrap_or_default()
        })
        .collect())
}

// ============================================================================
// UPSTREAM SHAPE
// ============================================================================

/// A number the upstream sometimes sends as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContestsResponse {
    data: Option<ContestsData>,
}

#[derive(Debug, Deserialize)]
struct ContestsData {
    contests: Option<Vec<Contest>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub contest_id: Option<Scalar>,
    pub teams: Option<Vec<Team>>,
    pub start_time: Option<String>,
    pub start_date: Option<String>,
    pub final_message: Option<String>,
    pub url: Option<String>,
    pub broadcaster_name: Option<String>,
    pub live_videos: Option<Vec<Value>>,
    pub start_time_epoch: Option<Scalar>,
    pub game_state: Option<String>,
    pub current_period: Option<String>,
    pub contest_clock: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub is_home: Option<bool>,
    pub is_winner: Option<bool>,
    pub score: Option<Scalar>,
    pub name_short: Option<String>,
    #[serde(rename = "name6Char")]
    pub name6_char: Option<String>,
    pub seoname: Option<String>,
    pub seed: Option<Scalar>,
    pub team_rank: Option<Scalar>,
    pub conference_seo: Option<String>,
}

// ============================================================================
// LEGACY DOCUMENT (ENRICHMENT SOURCE)
// ============================================================================

/// The parts of an upstream `scoreboard.json` used to fill fields the
/// contests query lacks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyDocument {
    #[serde(default)]
    games: Vec<LegacyDocumentEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LegacyDocumentEntry {
    game: Option<LegacyDocumentGame>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LegacyDocumentGame {
    home: Option<LegacyDocumentTeam>,
    away: Option<LegacyDocumentTeam>,
    network: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDocumentTeam {
    names: Option<LegacyDocumentNames>,
    description: Option<String>,
    conferences: Option<Vec<LegacyDocumentConference>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LegacyDocumentNames {
    short: Option<String>,
    full: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDocumentConference {
    conference_name: Option<String>,
}

impl LegacyDocumentTeam {
    fn short_name(&self) -> Option<String> {
        self.names
            .as_ref()
            .and_then(|names| names.short.as_deref())
            .map(str::to_lowercase)
    }
}

impl LegacyDocument {
    /// Game whose short team names match `a` and `b` in either orientation,
    /// ignoring case.
    fn find_game(&self, a: &str, b: &str) -> Option<&LegacyDocumentGame> {
        let (a, b) = (a.to_lowercase(), b.to_lowercase());
        self.games
            .iter()
            .filter_map(|entry| entry.game.as_ref())
            .find(|game| {
                let home = game.home.as_ref().and_then(LegacyDocumentTeam::short_name);
                let away = game.away.as_ref().and_then(LegacyDocumentTeam::short_name);
                match (home, away) {
                    (Some(home), Some(away)) => {
                        (home == a && away == b) || (home == b && away == a)
                    }
                    _ => false,
                }
            })
    }
}

/// Basketball and football no longer publish legacy documents.
pub fn has_legacy_document(sport: &str) -> bool {
    !sport.starts_with("basket") && !sport.starts_with("football")
}

/// Best-effort read of the legacy document at `url`. Any failure yields
/// `None` and the conversion proceeds with empty fields.
pub async fn fetch_legacy_document(
    upstream: &dyn Upstream,
    url: &str,
    sport: &str,
) -> Option<LegacyDocument> {
    if !has_legacy_document(sport) {
        return None;
    }
    let body = match upstream.get_json(url).await {
        Ok(body) => body,
        Err(err) => {
            tracing::debug!(url, error = %err, "Legacy scoreboard unavailable for enrichment");
            return None;
        }
    };
    match serde_json::from_value(body) {
        Ok(document) => Some(document),
        Err(err) => {
            tracing::debug!(url, error = %err, "Legacy scoreboard not usable for enrichment");
            None
        }
    }
}

// ============================================================================
// LEGACY SHAPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyScoreboard {
    #[serde(rename = "inputMD5Sum")]
    pub input_md5_sum: String,
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    pub updated_at: String,
    pub games: Vec<GameEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameEntry {
    pub game: LegacyGame,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyGame {
    #[serde(rename = "gameID")]
    pub game_id: String,
    pub away: LegacyTeam,
    pub final_message: String,
    pub bracket_round: String,
    pub title: String,
    pub contest_name: String,
    pub url: String,
    pub network: String,
    pub home: LegacyTeam,
    pub live_video_enabled: bool,
    pub start_time: String,
    pub start_time_epoch: String,
    pub bracket_id: String,
    pub game_state: String,
    pub start_date: String,
    pub current_period: String,
    pub video_state: String,
    pub bracket_region: String,
    pub contest_clock: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyTeam {
    pub score: String,
    pub names: TeamNames,
    pub winner: bool,
    pub seed: String,
    pub description: String,
    pub rank: String,
    pub conferences: Vec<LegacyConference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamNames {
    pub char6: String,
    pub short: String,
    pub seo: String,
    pub full: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyConference {
    pub conference_name: String,
    pub conference_seo: String,
}

// ============================================================================
// CONVERSION
// ============================================================================

/// Legacy `gameState` for a contest state letter.
pub fn normalize_game_state(state: &str) -> &'static str {
    match state {
        "F" => "final",
        "I" => "live",
        _ => "pre",
    }
}

/// `19:30` on a dated contest becomes `7:30 PM ET`. Anything that does not
/// parse as a 24-hour time is passed through.
fn legacy_start_time(start_time: &str, start_date: &str) -> String {
    if start_time.is_empty() || start_date.is_empty() {
        return start_time.to_string();
    }
    match NaiveTime::parse_from_str(start_time, "%H:%M") {
        Ok(time) => format!("{} ET", time.format("%-I:%M %p")),
        Err(_) => start_time.to_string(),
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn scalar_text(value: &Option<Scalar>) -> String {
    value.as_ref().map(Scalar::to_string).unwrap_or_default()
}

fn legacy_team(team: &Team, old: Option<&LegacyDocumentTeam>) -> LegacyTeam {
    let full = old
        .and_then(|old| old.names.as_ref())
        .and_then(|names| names.full.clone())
        .unwrap_or_default();
    let description = old
        .and_then(|old| old.description.clone())
        .unwrap_or_default();
    let conference_name = old
        .and_then(|old| old.conferences.as_ref())
        .and_then(|conferences| conferences.first())
        .and_then(|conference| conference.conference_name.clone())
        .unwrap_or_default();

    LegacyTeam {
        score: scalar_text(&team.score),
        names: TeamNames {
            char6: text(&team.name6_char),
            short: text(&team.name_short),
            seo: text(&team.seoname),
            full,
        },
        winner: team.is_winner.unwrap_or(false),
        seed: scalar_text(&team.seed),
        description,
        rank: scalar_text(&team.team_rank),
        conferences: vec![LegacyConference {
            conference_name,
            conference_seo: text(&team.conference_seo),
        }],
    }
}

/// Legacy game for a contest, or `None` unless it has both a home and an
/// away team. Fields the contest lacks are taken from the matching game in
/// `document`, if any.
pub fn legacy_game(contest: &Contest, document: Option<&LegacyDocument>) -> Option<LegacyGame> {
    let teams = contest.teams.as_deref().unwrap_or_default();
    let home = teams.iter().find(|team| team.is_home == Some(true))?;
    let away = teams.iter().find(|team| team.is_home != Some(true))?;

    let matched = document.and_then(|document| {
        document.find_game(
            home.name_short.as_deref().unwrap_or_default(),
            away.name_short.as_deref().unwrap_or_default(),
        )
    });
    let network = matched
        .and_then(|game| game.network.clone())
        .filter(|network| !network.is_empty())
        .unwrap_or_else(|| text(&contest.broadcaster_name));

    Some(LegacyGame {
        game_id: scalar_text(&contest.contest_id),
        away: legacy_team(away, matched.and_then(|game| game.away.as_ref())),
        final_message: text(&contest.final_message),
        bracket_round: String::new(),
        title: format!(
            "{} {}",
            away.name_short.as_deref().unwrap_or_default(),
            home.name_short.as_deref().unwrap_or_default()
        ),
        contest_name: String::new(),
        url: text(&contest.url),
        network,
        home: legacy_team(home, matched.and_then(|game| game.home.as_ref())),
        live_video_enabled: contest
            .live_videos
            .as_ref()
            .is_some_and(|videos| !videos.is_empty()),
        start_time: legacy_start_time(
            contest.start_time.as_deref().unwrap_or_default(),
            contest.start_date.as_deref().unwrap_or_default(),
        ),
        start_time_epoch: scalar_text(&contest.start_time_epoch),
        bracket_id: String::new(),
        game_state: normalize_game_state(contest.game_state.as_deref().unwrap_or_default())
            .to_string(),
        start_date: text(&contest.start_date),
        current_period: text(&contest.current_period),
        video_state: String::new(),
        bracket_region: String::new(),
        contest_clock: contest
            .contest_clock
            .clone()
            .filter(|clock| !clock.is_empty())
            .unwrap_or_else(|| "0:00".to_string()),
    })
}

/// Rebuild contests as a legacy scoreboard.
///
/// `inputMD5Sum` is the hex MD5 of the serialized `games` array.
pub fn to_legacy(
    contests: &[Contest],
    document: Option<&LegacyDocument>,
    instance_id: &str,
    now: NaiveDateTime,
) -> BoxscoreResult<LegacyScoreboard> {
    let games: Vec<GameEntry> = contests
        .iter()
        .filter_map(|contest| legacy_game(contest, document))
        .map(|game| GameEntry { game })
        .collect();

    let digest = Md5::digest(serde_json::to_string(&games)?.as_bytes());

    Ok(LegacyScoreboard {
        input_md5_sum: hex::encode(digest),
        instance_id: instance_id.to_string(),
        updated_at: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        games,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxscore_test_utils::assertions::assert_fetch_status;
    use boxscore_test_utils::{fixtures, MockUpstream};
    use chrono::NaiveDate;

    fn parse(value: Value) -> Vec<Contest> {
        serde_json::from_value::<ContestsResponse>(value)
            .unwrap()
            .data
            .and_then(|d| d.contests)
            .unwrap_or_default()
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 31)
            .unwrap()
            .and_hms_opt(12, 0, 5)
            .unwrap()
    }

    #[test]
    fn test_game_state_normalization() {
        assert_eq!(normalize_game_state("F"), "final");
        assert_eq!(normalize_game_state("P"), "pre");
        assert_eq!(normalize_game_state("I"), "live");
        assert_eq!(normalize_game_state("X"), "pre");
        assert_eq!(normalize_game_state(""), "pre");
    }

    #[test]
    fn test_start_time_conversion() {
        assert_eq!(legacy_start_time("19:30", "08/30/2025"), "7:30 PM ET");
        assert_eq!(legacy_start_time("12:00", "08/30/2025"), "12:00 PM ET");
        assert_eq!(legacy_start_time("19:30", ""), "19:30");
        assert_eq!(legacy_start_time("TBA", "08/30/2025"), "TBA");
    }

    #[test]
    fn test_one_sided_contests_are_skipped() {
        let contests = parse(fixtures::contests_json());
        assert_eq!(contests.len(), 2);

        let board = to_legacy(&contests, None, "instance", noon()).unwrap();
        assert_eq!(board.games.len(), 1);
        assert_eq!(board.updated_at, "2025-08-31 12:00:05");
        assert_eq!(board.instance_id, "instance");
    }

    #[test]
    fn test_contest_converts_to_legacy_game() {
        let contests = parse(fixtures::contests_json());
        let game = legacy_game(&contests[0], None).unwrap();

        assert_eq!(game.game_id, "6308711");
        assert_eq!(game.title, "Clemson LSU");
        assert_eq!(game.game_state, "final");
        assert_eq!(game.network, "ESPN");
        assert_eq!(game.start_time, "7:30 PM ET");
        assert_eq!(game.start_time_epoch, "1756596600");
        assert_eq!(game.contest_clock, "0:00");
        assert!(!game.live_video_enabled);

        assert_eq!(game.home.score, "38");
        assert!(game.home.winner);
        assert_eq!(game.home.rank, "9");
        assert_eq!(game.home.conferences[0].conference_seo, "sec");
        assert_eq!(game.away.names.char6, "CLEM");
        assert_eq!(game.away.seed, "");
        assert!(!game.away.winner);
    }

    #[test]
    fn test_legacy_field_names_and_order() {
        let contests = parse(fixtures::contests_json());
        let board = to_legacy(&contests, None, "instance", noon()).unwrap();
        let json = serde_json::to_string(&board).unwrap();

        assert!(json.starts_with(r#"{"inputMD5Sum":""#));
        assert!(json.contains(r#"{"game":{"gameID":"6308711","away":{"score":"17""#));
        assert!(json.contains(r#""conferences":[{"conferenceName":"","conferenceSeo":"acc"}]"#));
        assert!(json.contains(r#""liveVideoEnabled":false"#));
    }

    #[test]
    fn test_md5_covers_games_only() {
        let contests = parse(fixtures::contests_json());
        let a = to_legacy(&contests, None, "one", noon()).unwrap();
        let b = to_legacy(&contests, None, "two", noon()).unwrap();
        assert_eq!(a.input_md5_sum, b.input_md5_sum);
        assert_eq!(a.input_md5_sum.len(), 32);

        let empty = to_legacy(&[], None, "one", noon()).unwrap();
        // md5("[]")
        assert_eq!(empty.input_md5_sum, "d751713988987e9331980363e24189ce");
    }

    #[test]
    fn test_legacy_document_fills_missing_fields() {
        let contests = parse(fixtures::contests_json());
        let document: LegacyDocument =
            serde_json::from_value(fixtures::legacy_enrichment_json()).unwrap();
        let game = legacy_game(&contests[0], Some(&document)).unwrap();

        assert_eq!(game.home.names.full, "Louisiana State University");
        assert_eq!(game.home.conferences[0].conference_name, "SEC");
        assert_eq!(game.home.description, "(1-0)");
        assert_eq!(game.away.names.full, "Clemson University");
        assert_eq!(game.away.conferences[0].conference_name, "ACC");
        assert_eq!(game.network, "ABC");
        // Contest fields still win where both exist.
        assert_eq!(game.home.score, "38");
        assert_eq!(game.away.conferences[0].conference_seo, "acc");
    }

    #[test]
    fn test_unmatched_game_keeps_empty_fields() {
        let contests = parse(fixtures::contests_json());
        let document: LegacyDocument =
            serde_json::from_value(fixtures::legacy_scoreboard_json()).unwrap();
        let game = legacy_game(&contests[0], Some(&document)).unwrap();

        assert_eq!(game.home.names.full, "");
        assert_eq!(game.home.conferences[0].conference_name, "");
        assert_eq!(game.network, "ESPN");
    }

    #[test]
    fn test_legacy_document_sports() {
        assert!(has_legacy_document("soccer-women"));
        assert!(has_legacy_document("baseball"));
        assert!(!has_legacy_document("basketball-men"));
        assert!(!has_legacy_document("football"));
    }

    #[tokio::test]
    async fn test_fetch_legacy_document_is_best_effort() {
        let upstream = MockUpstream::new();
        upstream.respond_json("https://data.test/ok", fixtures::legacy_enrichment_json());
        upstream.respond_json("https://data.test/odd", serde_json::json!({ "games": 3 }));

        assert!(fetch_legacy_document(&upstream, "https://data.test/ok", "soccer-women")
            .await
            .is_some());
        assert!(fetch_legacy_document(&upstream, "https://data.test/missing", "soccer-women")
            .await
            .is_none());
        assert!(fetch_legacy_document(&upstream, "https://data.test/odd", "soccer-women")
            .await
            .is_none());
        assert!(fetch_legacy_document(&upstream, "https://data.test/ok", "football")
            .await
            .is_none());
        assert_eq!(upstream.calls("https://data.test/ok"), 1);
    }

    #[test]
    fn test_variables_omit_absent_fields() {
        let query = ContestQuery {
            sport_code: "MFB",
            division: 11,
            season_year: 2025,
            contest_date: None,
            week: Some(3),
        };
        assert_eq!(
            query.variables(),
            serde_json::json!({ "sportCode": "MFB", "division": 11, "seasonYear": 2025, "week": 3 })
        );
    }

    #[tokio::test]
    async fn test_fetch_contests_concatenates_weeks() {
        let urls = UpstreamUrls::new("https://web.test", "https://data.test", "https://gql.test");
        let upstream = MockUpstream::new();
        let queries: Vec<ContestQuery> = PLAYOFF_WEEKS
            .iter()
            .map(|week| ContestQuery {
                sport_code: "MFB",
                division: 11,
                season_year: 2025,
                contest_date: None,
                week: Some(*week),
            })
            .collect();
        for query in &queries {
            upstream.respond_json(urls.contests(&query.variables()), fixtures::contests_json());
        }

        let contests = fetch_contests(&upstream, &urls, &queries).await.unwrap();
        assert_eq!(contests.len(), 2 * PLAYOFF_WEEKS.len());
        assert_eq!(upstream.total_calls(), PLAYOFF_WEEKS.len());
    }

    #[tokio::test]
    async fn test_fetch_contests_fails_when_any_week_fails() {
        let urls = UpstreamUrls::new("https://web.test", "https://data.test", "https://gql.test");
        let upstream = MockUpstream::new();
        let query = ContestQuery {
            sport_code: "WSO",
            division: 1,
            season_year: 2025,
            contest_date: Some("09/01/2025".to_string()),
            week: None,
        };

        let result = fetch_contests(&upstream, &urls, &[query]).await;
        assert_fetch_status(&result, 404);
    }
}
