//! OpenSea API client
//!
//! Endpoints implemented:
//! 1. /api/v2/collections/{slug}/stats - floor price and interval stats

use super::FloorAverage;
use crate::errors::{LendingError, LendingResult};
use crate::logger::{self, LogTag};
use serde::Deserialize;
use std::time::Duration;

const OPENSEA_BASE_URL: &str = "https://api.opensea.io/api/v2";

pub struct OpenSeaClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    total: StatsTotal,
    #[serde(default)]
    intervals: Vec<StatsInterval>,
}

#[derive(Debug, Deserialize)]
struct StatsTotal {
    floor_price: f64,
}

#[derive(Debug, Deserialize)]
struct StatsInterval {
    interval: String,
    average_price: f64,
}

impl OpenSeaClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> LendingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LendingError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: OPENSEA_BASE_URL.to_string(),
        })
    }

    /// Fetch a collection's floor price and trailing 24h average price
    pub async fn floor_average(&self, slug: &str) -> LendingResult<FloorAverage> {
        let api_key = self.api_key.as_deref().ok_or(LendingError::MissingCredential {
            venue: "opensea".to_string(),
        })?;

        let url = format!("{}/collections/{}/stats", self.base_url, slug);
        logger::debug(LogTag::Valuation, &format!("GET {}", url));

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .header("X-API-KEY", api_key)
            .send()
            .await
            .map_err(|e| LendingError::upstream("opensea", e))?;

        if !response.status().is_success() {
            return Err(LendingError::upstream(
                "opensea",
                format!("HTTP {} for {}", response.status(), slug),
            ));
        }

        let stats: StatsResponse = response
            .json()
            .await
            .map_err(|e| LendingError::upstream("opensea", e))?;

        parse_stats(slug, stats)
    }
}

/// Extract floor and one-day average from the stats payload.
///
/// Venue numbers are re-rendered as decimal strings and only converted to
/// base units by the exact scaler in `valuation::units`; no arithmetic is
/// performed on the floats themselves.
fn parse_stats(slug: &str, stats: StatsResponse) -> LendingResult<FloorAverage> {
    let one_day = stats
        .intervals
        .iter()
        .find(|i| i.interval == "one_day")
        .ok_or_else(|| {
            LendingError::upstream("opensea", format!("no one_day interval for {}", slug))
        })?;

    if stats.total.floor_price < 0.0 || one_day.average_price < 0.0 {
        return Err(LendingError::upstream(
            "opensea",
            format!("negative price reported for {}", slug),
        ));
    }

    Ok(FloorAverage {
        floor: format_price(stats.total.floor_price),
        average_24hr: format_price(one_day.average_price),
    })
}

fn format_price(price: f64) -> String {
    // Venue prices carry at most wei-level precision in practice; 18 digits
    // round-trips everything OpenSea actually serves.
    let mut rendered = format!("{:.18}", price);
    while rendered.ends_with('0') {
        rendered.pop();
    }
    if rendered.ends_with('.') {
        rendered.pop();
    }
    rendered
}
