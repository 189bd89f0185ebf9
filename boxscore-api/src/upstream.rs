//! Upstream HTTP client and URL templates.

use std::time::Duration;

use async_trait::async_trait;
use boxscore_core::{FetchError, Upstream};
use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::telemetry::METRICS;

const GAME_CENTER_OPERATION: &str = "GetGamecenterGameById_web";
const GAME_CENTER_HASH: &str = "93a02c7193c89d85bcdda8c1784925d9b64657f73ef584382e2297af555acd4b";
const CONTESTS_OPERATION: &str = "GetContests_web";
const CONTESTS_HASH: &str = "7287cda610a9326931931080cb3a604828febe6fe3c9016a7e4a36db99efdb7c";
const SCHEDULES_OPERATION: &str = "NCAA_schedules_today_web";
const SCHEDULES_HASH: &str = "a25ad021179ce1d97fb951a49954dc98da150089f9766e7e85890e439516ffbf";

// ============================================================================
// HTTP CLIENT
// ============================================================================

/// [`Upstream`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    timeout: Duration,
    metrics_enabled: bool,
}

impl HttpUpstream {
    pub fn new(timeout: Duration, metrics_enabled: bool) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("boxscore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::internal_error(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            timeout,
            metrics_enabled,
        })
    }

    async fn send(&self, kind: &'static str, url: &str) -> Result<reqwest::Response, FetchError> {
        tracing::debug!(url, "Fetching upstream");

        let response = self.client.get(url).send().await.map_err(|e| {
            self.record_fetch(kind, "error");
            if e.is_timeout() {
                FetchError::Timeout {
                    target: url.to_string(),
                    after: self.timeout,
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        self.record_fetch(kind, status.as_str());
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn record_fetch(&self, kind: &str, outcome: &str) {
        if !self.metrics_enabled {
            return;
        }
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_upstream_fetch(kind, outcome);
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.send("json", url)
            .await?
            .json()
            .await
            .map_err(|e| FetchError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.send("html", url)
            .await?
            .text()
            .await
            .map_err(|e| FetchError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

// ============================================================================
// URL TEMPLATES
// ============================================================================

/// Builds every upstream URL the service reads.
///
/// Bases never end in a slash. Path parts taken from the request are
/// inserted as-is; they already passed through the router.
#[derive(Debug, Clone)]
pub struct UpstreamUrls {
    web_base: String,
    data_base: String,
    graphql_base: String,
}

impl UpstreamUrls {
    pub fn new(
        web_base: impl Into<String>,
        data_base: impl Into<String>,
        graphql_base: impl Into<String>,
    ) -> Self {
        Self {
            web_base: web_base.into(),
            data_base: data_base.into(),
            graphql_base: graphql_base.into(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(&config.web_base, &config.data_base, &config.graphql_base)
    }

    /// HTML page for a scraped route. Pages after the first get a `/p{n}`
    /// suffix.
    pub fn page(&self, path: &str, page: Option<u32>) -> String {
        match page {
            Some(n) if n > 1 => format!("{}{}/p{}", self.web_base, path, n),
            _ => format!("{}{}", self.web_base, path),
        }
    }

    pub fn schools(&self) -> String {
        format!("{}/json/schools", self.web_base)
    }

    pub fn game_center(&self, id: &str) -> String {
        self.persisted_query(
            GAME_CENTER_OPERATION,
            GAME_CENTER_HASH,
            &json!({ "id": id, "week": null, "staticTestEnv": null }),
        )
    }

    pub fn game_page(&self, id: &str, page: &str) -> String {
        format!("{}/game/{}/{}.json", self.data_base, id, page)
    }

    pub fn schedule(&self, sport: &str, division: &str, rest: &str) -> String {
        format!(
            "{}/schedule/{}/{}/{}/schedule-all-conf.json",
            self.data_base, sport, division, rest
        )
    }

    pub fn today(&self, sport: &str, division: &str) -> String {
        format!("{}/schedule/{}/{}/today.json", self.data_base, sport, division)
    }

    pub fn scoreboard(&self, sport: &str, division: &str, date: &str) -> String {
        format!(
            "{}/scoreboard/{}/{}/{}/scoreboard.json",
            self.data_base, sport, division, date
        )
    }

    /// Contests query for one scoreboard day or week.
    pub fn contests(&self, variables: &Value) -> String {
        self.persisted_query(CONTESTS_OPERATION, CONTESTS_HASH, variables)
    }

    /// Schedules query for one sport, division and season. `sport_code` and
    /// `division` are the contests codes from [`crate::codes::division_code`].
    pub fn schedules(&self, sport_code: &str, division: u8, season_year: i32) -> String {
        self.persisted_query(
            SCHEDULES_OPERATION,
            SCHEDULES_HASH,
            &json!({ "sportCode": sport_code, "division": division, "seasonYear": season_year }),
        )
    }

    fn persisted_query(&self, operation: &str, hash: &str, variables: &Value) -> String {
        let extensions = json!({ "persistedQuery": { "version": 1, "sha256Hash": hash } });
        format!(
            "{}/?meta={}&extensions={}&variables={}",
            self.graphql_base,
            operation,
            urlencoding::encode(&extensions.to_string()),
            urlencoding::encode(&variables.to_string()),
        )
    }
}
