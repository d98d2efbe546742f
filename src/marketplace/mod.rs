//! Marketplace purchase-instruction adapter
//!
//! External REST collaborator for the PNPL flow: given a listed NFT it
//! returns the contract call that buys it, plus the price the flash loan has
//! to front. Failures are upstream failures; this core performs no retries.

use crate::errors::{LendingError, LendingResult};
use crate::logger::{self, LogTag};
use crate::types::{Blockchain, PurchaseInstruction};
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

pub struct MarketplaceClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PurchaseInstructionDto {
    to: String,
    calldata: String,
    /// Price in base units as a decimal string
    price: String,
    currency: String,
}

impl MarketplaceClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> LendingResult<Self> {
        if base_url.is_empty() {
            return Err(LendingError::Config(
                "marketplace.base_url is not configured".to_string(),
            ));
        }
        Url::parse(base_url).map_err(|e| {
            LendingError::Config(format!("Invalid marketplace.base_url '{}': {}", base_url, e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LendingError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key,
        })
    }

    /// Generate the purchase instruction for one listed NFT
    pub async fn purchase_instruction(
        &self,
        collection_address: &str,
        nft_id: &str,
        blockchain: &Blockchain,
    ) -> LendingResult<PurchaseInstruction> {
        let url = format!("{}/v1/purchase-instruction", self.base_url);
        logger::debug(
            LogTag::Marketplace,
            &format!("POST {} for {}:{}", url, collection_address, nft_id),
        );

        let mut request = self.http.post(&url).json(&json!({
            "collection": collection_address,
            "token_id": nft_id,
            "network": blockchain.network,
            "network_id": blockchain.network_id,
        }));
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LendingError::upstream("marketplace", e))?;

        if !response.status().is_success() {
            return Err(LendingError::upstream(
                "marketplace",
                format!("HTTP {} for {}:{}", response.status(), collection_address, nft_id),
            ));
        }

        let dto: PurchaseInstructionDto = response
            .json()
            .await
            .map_err(|e| LendingError::upstream("marketplace", e))?;

        let price = dto.price.parse::<u128>().map_err(|e| {
            LendingError::upstream("marketplace", format!("non-numeric price '{}': {}", dto.price, e))
        })?;

        // Calldata is forwarded opaquely but must at least be valid base64
        base64::engine::general_purpose::STANDARD
            .decode(&dto.calldata)
            .map_err(|e| {
                LendingError::upstream("marketplace", format!("malformed calldata: {}", e))
            })?;

        Ok(PurchaseInstruction {
            to: dto.to,
            calldata: dto.calldata,
            price,
            currency: dto.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_base_url_is_config_error() {
        assert!(matches!(
            MarketplaceClient::new("", None, Duration::from_secs(1)),
            Err(LendingError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        assert!(matches!(
            MarketplaceClient::new("not a url", None, Duration::from_secs(1)),
            Err(LendingError::Config(_))
        ));
    }

    #[test]
    fn test_dto_decodes() {
        let dto: PurchaseInstructionDto = serde_json::from_str(
            r#"{
                "to": "0xmarket",
                "calldata": "3q2+7w==",
                "price": "5000000000000000000",
                "currency": "ETH"
            }"#,
        )
        .unwrap();
        assert_eq!(dto.price, "5000000000000000000");
        assert_eq!(dto.to, "0xmarket");
    }
}
