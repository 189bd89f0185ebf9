//! Scoreboard reads.
//!
//! Date-less and dated spellings of the same day resolve to one upstream
//! document, the legacy `scoreboard.json` URL for that sport, division and
//! date. That URL is the [`UpstreamKey`] the reads share, whichever source
//! actually serves the document.

pub mod contests;
pub mod period;

use boxscore_cache::CacheRead;
use boxscore_core::{
    BoxscoreError, BoxscoreResult, Payload, ResourceKey, UpstreamKey, ValidationError,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::codes::{division_code, supports_contests};
use crate::resource::CacheTier;
use crate::state::AppState;
use contests::{ContestQuery, PLAYOFF_WEEKS};
use period::Period;

/// Where one scoreboard request reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreboardPlan {
    pub sport: String,
    pub division: String,
    /// Date segment as it appears in upstream URLs.
    pub date: String,
    /// Legacy `scoreboard.json` URL.
    pub url: String,
}

impl ScoreboardPlan {
    /// Contests queries covering this plan, when the sport, division and date
    /// are served by the contests query.
    pub fn contest_queries(&self) -> Option<Vec<ContestQuery>> {
        let (sport_code, division) = division_code(&self.sport, &self.division)?;
        let period = Period::parse(&self.date)?;
        if !matches!(period, Period::Day(_)) && self.sport != "football" {
            return None;
        }
        if !supports_contests(&self.sport, period.year(), period.month()) {
            return None;
        }

        let base = ContestQuery {
            sport_code,
            division,
            season_year: period.season_year(),
            contest_date: None,
            week: None,
        };

        Some(match period {
            Period::Day(date) => vec![ContestQuery {
                contest_date: Some(date.format("%m/%d/%Y").to_string()),
                ..base
            }],
            Period::Week { week, .. } => vec![ContestQuery {
                week: Some(week),
                ..base
            }],
            Period::Playoffs { .. } => PLAYOFF_WEEKS
                .iter()
                .map(|week| ContestQuery {
                    week: Some(*week),
                    ..base.clone()
                })
                .collect(),
        })
    }
}

/// Work out which document `rest` asks for.
///
/// `rest` is the path after `/scoreboard/{sport}/`; its first segment is the
/// division. Without a date in `rest` the current period is looked up.
pub async fn plan(
    state: &AppState,
    sport: &str,
    rest: &str,
    today: NaiveDate,
) -> BoxscoreResult<ScoreboardPlan> {
    let division = rest.split('/').next().unwrap_or_default();
    if division.is_empty() {
        return Err(ValidationError::MissingField {
            field: "Division".to_string(),
        }
        .into());
    }

    let date = match period::date_in_path(rest) {
        Some(date) => {
            period::check_year(date, today)?;
            date.to_string()
        }
        None => period::current_period(state, sport, division, today).await?,
    };

    Ok(ScoreboardPlan {
        url: state.urls.scoreboard(sport, division, &date),
        sport: sport.to_string(),
        division: division.to_string(),
        date,
    })
}

/// Load the scoreboard document for `plan`.
///
/// Contests are tried first where supported, with the legacy document for
/// the same day read alongside to fill fields contests lack. If the contests
/// query fails the legacy document is served as is.
pub async fn load(
    state: &AppState,
    plan: ScoreboardPlan,
    now: NaiveDateTime,
) -> BoxscoreResult<Payload> {
    if let Some(queries) = plan.contest_queries() {
        match contests::fetch_contests(state.upstream.as_ref(), &state.urls, &queries).await {
            Ok(found) => {
                let document = contests::fetch_legacy_document(
                    state.upstream.as_ref(),
                    &plan.url,
                    &plan.sport,
                )
                .await;
                let board =
                    contests::to_legacy(&found, document.as_ref(), &state.instance_id, now)?;
                return Ok(serde_json::to_string(&board)?.into());
            }
            Err(err) => {
                tracing::warn!(
                    sport = %plan.sport,
                    division = %plan.division,
                    date = %plan.date,
                    error = %err,
                    "Contests query failed, falling back to scoreboard.json"
                );
            }
        }
    }

    tracing::info!(url = %plan.url, "Fetching scoreboard");
    let body = state.upstream.get_json(&plan.url).await?;
    Ok(body.to_string().into())
}

/// Read the scoreboard for `key`, sharing the fetch with every other request
/// that resolves to the same upstream document.
pub async fn read(
    state: &AppState,
    key: &ResourceKey,
    sport: &str,
    rest: &str,
) -> BoxscoreResult<CacheRead> {
    let read = state
        .read_through
        .get_shared(
            &state.caches.short,
            key,
            move || async move {
                let plan = plan(state, sport, rest, Utc::now().date_naive()).await?;
                Ok::<_, BoxscoreError>((UpstreamKey::new(plan.url.clone()), plan))
            },
            move |plan| load(state, plan, Utc::now().naive_utc()),
        )
        .await?;
    state.record_lookup(CacheTier::Short, &read);
    Ok(read)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_for(sport: &str, division: &str, date: &str) -> ScoreboardPlan {
        ScoreboardPlan {
            sport: sport.to_string(),
            division: division.to_string(),
            date: date.to_string(),
            url: String::new(),
        }
    }

    #[test]
    fn test_legacy_only_before_contests_coverage() {
        assert_eq!(plan_for("baseball", "d1", "2024/06/24").contest_queries(), None);
        assert_eq!(plan_for("football", "fbs", "2024/05").contest_queries(), None);
    }

    #[test]
    fn test_unknown_division_uses_legacy() {
        assert_eq!(plan_for("icehockey-men", "d2", "2026/01/10").contest_queries(), None);
        assert_eq!(plan_for("rowing", "d1", "2026/01/10").contest_queries(), None);
    }

    #[test]
    fn test_day_query() {
        let queries = plan_for("soccer-women", "d1", "2025/09/01")
            .contest_queries()
            .unwrap();
        assert_eq!(
            queries,
            vec![ContestQuery {
                sport_code: "WSO",
                division: 1,
                season_year: 2025,
                contest_date: Some("09/01/2025".to_string()),
                week: None,
            }]
        );
    }

    #[test]
    fn test_football_week_and_playoffs() {
        let queries = plan_for("football", "fbs", "2025/05").contest_queries().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].week, Some(5));
        assert_eq!(queries[0].division, 11);

        let queries = plan_for("football", "fcs", "2025/P").contest_queries().unwrap();
        let weeks: Vec<_> = queries.iter().filter_map(|q| q.week).collect();
        assert_eq!(weeks, PLAYOFF_WEEKS.to_vec());
    }

    #[test]
    fn test_week_form_is_football_only() {
        assert_eq!(plan_for("basketball-men", "d1", "2026/03").contest_queries(), None);
    }
}
