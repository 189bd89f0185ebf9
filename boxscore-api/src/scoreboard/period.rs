//! Scoreboard periods: calendar days, football weeks and the playoffs.

use boxscore_core::{
    BoxscoreError, BoxscoreResult, FetchError, Payload, ResourceKey, Upstream, ValidationError,
};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::codes;
use crate::resource::CacheTier;
use crate::state::AppState;
use crate::upstream::UpstreamUrls;

static DATE_IN_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}/\d{2}/\d{2})|(\d{4}/(\d{2}|P))").expect("Invalid scoreboard date regex")
});

/// A parsed scoreboard date segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// `YYYY/MM/DD`
    Day(NaiveDate),
    /// `YYYY/WW`, a football week
    Week { year: i32, week: u32 },
    /// `YYYY/P`, every football playoff week
    Playoffs { year: i32 },
}

impl Period {
    pub fn parse(date: &str) -> Option<Self> {
        let parts: Vec<&str> = date.split('/').collect();
        match parts.as_slice() {
            [year, month, day] => NaiveDate::from_ymd_opt(
                year.parse().ok()?,
                month.parse().ok()?,
                day.parse().ok()?,
            )
            .map(Period::Day),
            [year, "P"] => Some(Period::Playoffs {
                year: year.parse().ok()?,
            }),
            [year, week] => Some(Period::Week {
                year: year.parse().ok()?,
                week: week.parse().ok()?,
            }),
            _ => None,
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            Period::Day(date) => date.year(),
            Period::Week { year, .. } | Period::Playoffs { year } => *year,
        }
    }

    /// Calendar month, or 0 for week-based periods.
    pub fn month(&self) -> u32 {
        match self {
            Period::Day(date) => date.month(),
            _ => 0,
        }
    }

    /// Year a season is filed under. Seasons that cross New Year belong to
    /// the year they start in, which is taken to be July or later.
    pub fn season_year(&self) -> i32 {
        match self {
            Period::Day(date) if date.month() < 7 => date.year() - 1,
            _ => self.year(),
        }
    }
}

/// First date segment in a scoreboard path remainder.
pub fn date_in_path(rest: &str) -> Option<&str> {
    DATE_IN_PATH.find(rest).map(|m| m.as_str())
}

/// Reject dates more than a year past `today`'s year.
pub fn check_year(date: &str, today: NaiveDate) -> Result<(), ValidationError> {
    let year: i32 = date
        .get(..4)
        .and_then(|year| year.parse().ok())
        .ok_or_else(|| ValidationError::InvalidDate {
            date: date.to_string(),
        })?;
    if year > today.year() + 1 {
        return Err(ValidationError::InvalidDate {
            date: date.to_string(),
        });
    }
    Ok(())
}

/// Path form of the date the schedules query reports as today.
///
/// Days come back as `MM/DD/YYYY` and football weeks as `W/YYYY`.
pub fn schedule_date(raw: &str) -> Option<String> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    let date = match parts.as_slice() {
        [month, day, year] => format!("{}/{:0>2}/{:0>2}", year, month, day),
        [week, year] => format!("{}/{:0>2}", year, week),
        _ => return None,
    };
    match Period::parse(&date)? {
        Period::Day(_) | Period::Week { .. } => Some(date),
        Period::Playoffs { .. } => None,
    }
}

/// Ask the schedules query which date is current for a sport and division.
pub async fn schedules_today(
    upstream: &dyn Upstream,
    urls: &UpstreamUrls,
    sport: &str,
    division: &str,
    today: NaiveDate,
) -> BoxscoreResult<String> {
    let (sport_code, division_code) =
        codes::division_code(sport, division).ok_or_else(|| ValidationError::UnsupportedDivision {
            sport: sport.to_string(),
            division: division.to_string(),
        })?;
    let url = urls.schedules(sport_code, division_code, Period::Day(today).season_year());
    let body = upstream.get_json(&url).await?;

    body.pointer("/data/schedules/today/date")
        .and_then(Value::as_str)
        .and_then(schedule_date)
        .ok_or_else(|| {
            FetchError::Decode {
                url,
                reason: "missing schedules.today.date".to_string(),
            }
            .into()
        })
}

/// The date segment currently in play for a sport and division, cached on
/// the long tier.
///
/// `today.json` is asked first. When it fails, the schedules query is tried
/// for divisions it covers; if that fails too the `today.json` error stands.
pub async fn current_period(
    state: &AppState,
    sport: &str,
    division: &str,
    today: NaiveDate,
) -> BoxscoreResult<String> {
    let key = ResourceKey::new(format!("today-{}-{}", sport, division));
    let url = state.urls.today(sport, division);
    let url = &url;

    let read = state
        .read(CacheTier::Long, &key, move || async move {
            let err = match today_json(state.upstream.as_ref(), url).await {
                Ok(date) => return Ok::<Payload, BoxscoreError>(Payload::from(date)),
                Err(err) => err,
            };
            tracing::warn!(
                sport,
                division,
                error = %err,
                "today.json failed, asking schedules query"
            );
            let upstream = state.upstream.as_ref();
            match schedules_today(upstream, &state.urls, sport, division, today).await {
                Ok(date) => Ok(Payload::from(date)),
                Err(fallback) => {
                    tracing::debug!(sport, division, error = %fallback, "Schedules query failed");
                    Err(err)
                }
            }
        })
        .await?;

    Ok(read.value().to_string())
}

async fn today_json(upstream: &dyn Upstream, url: &str) -> BoxscoreResult<String> {
    tracing::info!(url, "Fetching today.json");
    let body = upstream.get_json(url).await?;
    match body.get("today").and_then(Value::as_str) {
        Some(today) => Ok(today.to_string()),
        None => Err(FetchError::Decode {
            url: url.to_string(),
            reason: "missing \"today\" field".to_string(),
        }
        .into()),
    }
}
