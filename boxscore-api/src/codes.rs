//! Sport and division codes used by the contests GraphQL query.

/// GraphQL sport code and the numeric codes of its divisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SportCode {
    pub sport: &'static str,
    pub code: &'static str,
    pub divisions: &'static [(&'static str, u8)],
}

const D1_D2_D3: &[(&str, u8)] = &[("d1", 1), ("d2", 2), ("d3", 3)];
const D1_D3: &[(&str, u8)] = &[("d1", 1), ("d3", 3)];
const D1: &[(&str, u8)] = &[("d1", 1)];

pub const SPORT_CODES: &[SportCode] = &[
    SportCode { sport: "football", code: "MFB", divisions: &[("fbs", 11), ("fcs", 12)] },
    SportCode { sport: "fieldhockey", code: "WFH", divisions: D1_D2_D3 },
    SportCode { sport: "soccer-men", code: "MSO", divisions: D1_D2_D3 },
    SportCode { sport: "soccer-women", code: "WSO", divisions: D1_D2_D3 },
    SportCode { sport: "volleyball-women", code: "WVB", divisions: D1_D2_D3 },
    SportCode { sport: "waterpolo-men", code: "MWP", divisions: D1 },
    SportCode { sport: "basketball-men", code: "MBB", divisions: D1_D2_D3 },
    SportCode { sport: "basketball-women", code: "WBB", divisions: D1_D2_D3 },
    SportCode { sport: "icehockey-men", code: "MIH", divisions: D1_D3 },
    SportCode { sport: "icehockey-women", code: "WIH", divisions: D1_D3 },
    SportCode { sport: "baseball", code: "MBA", divisions: D1_D2_D3 },
    SportCode { sport: "lacrosse-men", code: "MLA", divisions: D1_D2_D3 },
    SportCode { sport: "lacrosse-women", code: "WLA", divisions: D1_D2_D3 },
    SportCode { sport: "softball", code: "WSB", divisions: D1_D2_D3 },
    SportCode { sport: "volleyball-men", code: "MVB", divisions: D1_D3 },
    SportCode { sport: "waterpolo-women", code: "WWP", divisions: D1 },
];

pub fn sport_code(sport: &str) -> Option<&'static SportCode> {
    SPORT_CODES.iter().find(|code| code.sport == sport)
}

/// GraphQL sport code and numeric division for a route's sport and division.
pub fn division_code(sport: &str, division: &str) -> Option<(&'static str, u8)> {
    let sport = sport_code(sport)?;
    sport
        .divisions
        .iter()
        .find(|(name, _)| *name == division)
        .map(|(_, number)| (sport.code, *number))
}

/// Whether the contests query has data for a period.
///
/// The query covers 2026 onwards, all of the 2025 football season, and other
/// sports from August 2025. `month` is ignored for football, whose periods
/// are weeks.
pub fn supports_contests(sport: &str, year: i32, month: u32) -> bool {
    year >= 2026 || (year == 2025 && (sport == "football" || month >= 8))
}
