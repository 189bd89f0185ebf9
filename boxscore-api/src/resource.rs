//! Served resources and their cache tiers.

use std::str::FromStr;

use boxscore_core::{ResourceKey, ValidationError};

/// Which cache store a resource lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    Long,
    Short,
}

impl CacheTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Long => "long",
            CacheTier::Short => "short",
        }
    }
}

/// First path segment of a data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Stats,
    Rankings,
    Standings,
    History,
    Schedule,
    ScheduleAlt,
    SchoolsIndex,
    Game,
    Scoreboard,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Stats,
        Resource::Rankings,
        Resource::Standings,
        Resource::History,
        Resource::Schedule,
        Resource::ScheduleAlt,
        Resource::SchoolsIndex,
        Resource::Game,
        Resource::Scoreboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Stats => "stats",
            Resource::Rankings => "rankings",
            Resource::Standings => "standings",
            Resource::History => "history",
            Resource::Schedule => "schedule",
            Resource::ScheduleAlt => "schedule-alt",
            Resource::SchoolsIndex => "schools-index",
            Resource::Game => "game",
            Resource::Scoreboard => "scoreboard",
        }
    }

    pub fn tier(&self) -> CacheTier {
        match self {
            Resource::Game | Resource::Scoreboard => CacheTier::Short,
            _ => CacheTier::Long,
        }
    }

    /// Whether this resource is served by scraping an HTML page.
    pub fn is_scraped(&self) -> bool {
        matches!(
            self,
            Resource::Stats | Resource::Rankings | Resource::Standings | Resource::History
        )
    }

    /// Resource named by the first segment of `path`.
    pub fn from_path(path: &str) -> Result<Self, ValidationError> {
        let segment = path.trim_start_matches('/').split('/').next().unwrap_or_default();
        segment.parse()
    }
}

impl FromStr for Resource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|resource| resource.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownResource {
                resource: s.to_string(),
            })
    }
}

/// Per-request facts established before any handler runs.
#[derive(Debug, Clone)]
pub struct ResourceContext {
    pub resource: Resource,
    pub tier: CacheTier,
    pub cache_key: ResourceKey,
    /// Validated `page` query parameter.
    pub page: Option<u32>,
}

impl ResourceContext {
    /// Validate `path` and the raw `page` parameter and build the context.
    ///
    /// The page is checked before the resource so that a bad page on an
    /// unknown resource still reports the page.
    pub fn resolve(path: &str, page: Option<&str>) -> Result<Self, ValidationError> {
        let page_number = match page {
            Some(raw) => Some(parse_page(raw)?),
            None => None,
        };
        let resource = Resource::from_path(path)?;

        Ok(Self {
            resource,
            tier: resource.tier(),
            cache_key: ResourceKey::for_request(path, page),
            page: page_number,
        })
    }
}

/// Digits only. Values past `u32::MAX` saturate.
fn parse_page(raw: &str) -> Result<u32, ValidationError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidPage {
            value: raw.to_string(),
        });
    }
    Ok(raw.bytes().fold(0u32, |page, digit| {
        page.saturating_mul(10).saturating_add(u32::from(digit - b'0'))
    }))
}
