//! Venue adapters for external valuation sources

pub mod nftbank;
pub mod opensea;
pub mod synthetic;

/// Floor and trailing 24h average price as decimal strings in whole-currency
/// units, exactly as the venue reported them
#[derive(Debug, Clone)]
pub struct FloorAverage {
    pub floor: String,
    pub average_24hr: String,
}
