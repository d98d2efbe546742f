//! Attestation Signer
//!
//! Binds collection, NFT id, valuation and an expiry block into a signature
//! the pool contract can verify. The message hash itself is produced by the
//! target pool's canonical hashing function on-chain, so the encoding is
//! authoritative in one place; this module only reads the block height,
//! derives the expiry and signs the 32-byte hash.

use crate::chain::ChainContext;
use crate::config::SignerConfig;
use crate::errors::{LendingError, LendingResult};
use crate::logger::{self, LogTag};
use crate::types::Attestation;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

pub struct AttestationSigner {
    key: SigningKey,
    horizon_blocks: u64,
}

impl AttestationSigner {
    /// Build the signer from configuration.
    ///
    /// A missing key is a hard `SignerNotConfigured` failure; an unusable
    /// signer must never degrade into a sentinel signature value.
    pub fn from_config(config: &SignerConfig) -> LendingResult<Self> {
        let raw = config
            .attestation_key
            .as_deref()
            .ok_or(LendingError::SignerNotConfigured)?;

        if config.horizon_blocks == 0 {
            return Err(LendingError::Config(
                "signer.horizon_blocks must be positive".to_string(),
            ));
        }

        Ok(Self {
            key: parse_signing_key(raw)?,
            horizon_blocks: config.horizon_blocks,
        })
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Sign a valuation for one NFT against one pool.
    ///
    /// Reads the current block height, sets the expiry a configured horizon
    /// ahead, asks the pool contract for its canonical message hash and signs
    /// it with the process-wide key.
    pub async fn sign_valuation(
        &self,
        collection_address: &str,
        nft_id: &str,
        amount: u128,
        pool_address: &str,
        ctx: &ChainContext,
    ) -> LendingResult<Attestation> {
        let client = ctx.client()?;

        let issued_at_block = client.block_height().await?;
        let expires_at_block = issued_at_block + self.horizon_blocks;

        let hash = client
            .valuation_message_hash(pool_address, collection_address, nft_id, amount, expires_at_block)
            .await?;

        let signature = self.key.sign(&hash);

        logger::debug(
            LogTag::Signer,
            &format!(
                "Signed valuation for {}:{} on pool {}, expires at block {}",
                collection_address, nft_id, pool_address, expires_at_block
            ),
        );

        Ok(Attestation {
            signature: bs58::encode(signature.to_bytes()).into_string(),
            issued_at_block,
            expires_at_block,
        })
    }
}

/// Parse an ed25519 key from either bs58 or a `[1,2,...]` byte array string.
/// Accepts a 32-byte seed or a 64-byte keypair.
fn parse_signing_key(raw: &str) -> LendingResult<SigningKey> {
    let bytes = if raw.starts_with('[') && raw.ends_with(']') {
        raw.trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|s| s.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| LendingError::Config(format!("Invalid key byte array: {}", e)))?
    } else {
        bs58::decode(raw)
            .into_vec()
            .map_err(|e| LendingError::Config(format!("Invalid bs58 key: {}", e)))?
    };

    match bytes.len() {
        32 => {
            let seed: [u8; 32] = bytes.try_into().expect("length checked");
            Ok(SigningKey::from_bytes(&seed))
        }
        64 => {
            let pair: [u8; 64] = bytes.try_into().expect("length checked");
            SigningKey::from_keypair_bytes(&pair)
                .map_err(|e| LendingError::Config(format!("Invalid keypair bytes: {}", e)))
        }
        len => Err(LendingError::Config(format!(
            "Invalid key length: expected 32 or 64 bytes, got {}",
            len
        ))),
    }
}
