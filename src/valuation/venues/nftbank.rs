//! NFTBank API client
//!
//! Per-token valuation venue. A contract is first resolved to its collection
//! grouping, then priced at the grouping level; the resolver falls back once
//! to the direct contract-level estimate when the grouping lookup fails.
//!
//! Endpoints implemented:
//! 1. /v1/collections/{contract}/grouping - collection grouping id
//! 2. /v1/estimates/{id} - floor and 24h average for a grouping or contract

use super::FloorAverage;
use crate::errors::{LendingError, LendingResult};
use crate::logger::{self, LogTag};
use serde::Deserialize;
use std::time::Duration;

const NFTBANK_BASE_URL: &str = "https://api.nftbank.ai";

pub struct NftBankClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GroupingResponse {
    grouping_id: String,
}

#[derive(Debug, Deserialize)]
struct EstimateResponse {
    floor_price: String,
    average_price_24hr: String,
}

impl NftBankClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> LendingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LendingError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: NFTBANK_BASE_URL.to_string(),
        })
    }

    fn api_key(&self) -> LendingResult<&str> {
        self.api_key.as_deref().ok_or(LendingError::MissingCredential {
            venue: "nftbank".to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> LendingResult<T> {
        let api_key = self.api_key()?;
        logger::debug(LogTag::Valuation, &format!("GET {}", url));

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .header("x-api-key", api_key)
            .send()
            .await
            .map_err(|e| LendingError::upstream("nftbank", e))?;

        if !response.status().is_success() {
            return Err(LendingError::upstream(
                "nftbank",
                format!("HTTP {} for {}", response.status(), url),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| LendingError::upstream("nftbank", e))
    }

    /// Resolve a contract address to its collection grouping id
    pub async fn collection_grouping(&self, contract: &str) -> LendingResult<String> {
        let url = format!("{}/v1/collections/{}/grouping", self.base_url, contract);
        let grouping: GroupingResponse = self.get_json(&url).await?;
        Ok(grouping.grouping_id)
    }

    /// Floor and 24h average for a grouping id or raw contract address
    pub async fn floor_average(&self, id: &str) -> LendingResult<FloorAverage> {
        let url = format!("{}/v1/estimates/{}", self.base_url, id);
        let estimate: EstimateResponse = self.get_json(&url).await?;

        Ok(FloorAverage {
            floor: estimate.floor_price,
            average_24hr: estimate.average_price_24hr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_response_decodes() {
        let estimate: EstimateResponse = serde_json::from_str(
            r#"{ "floor_price": "4.2", "average_price_24hr": "4.8" }"#,
        )
        .unwrap();
        assert_eq!(estimate.floor_price, "4.2");
        assert_eq!(estimate.average_price_24hr, "4.8");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_credential_error() {
        let client = NftBankClient::new(None, Duration::from_secs(1)).unwrap();
        assert!(matches!(
            client.collection_grouping("0xabc").await,
            Err(LendingError::MissingCredential { .. })
        ));
    }
}
