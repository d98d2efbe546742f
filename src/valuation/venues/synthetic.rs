//! Synthetic valuation source for non-production networks
//!
//! Serves fixed stub values for reserved test-collection identifiers. The
//! source is consulted only when `valuation.synthetic` is set in the config;
//! collection ids are matched exactly, never by substring, so test behaviour
//! cannot leak into a production valuation path.

use crate::config::SyntheticValuationEntry;
use crate::errors::LendingResult;
use crate::types::{Valuation, Venue};
use crate::valuation::units::parse_base_units;
use chrono::Utc;
use std::collections::HashMap;

pub struct SyntheticSource {
    values: HashMap<String, (u128, u128)>,
}

impl SyntheticSource {
    pub fn from_entries(
        entries: &[SyntheticValuationEntry],
        decimals: u32,
    ) -> LendingResult<Self> {
        let mut values = HashMap::new();
        for entry in entries {
            let value = parse_base_units(&entry.value, decimals)?;
            let value_24hr = parse_base_units(&entry.value_24hr, decimals)?;
            values.insert(entry.collection_id.clone(), (value, value_24hr));
        }
        Ok(Self { values })
    }

    /// Stub valuation for a reserved collection id, if one is registered
    pub fn valuation_for(&self, collection_id: &str) -> Option<Valuation> {
        self.values.get(collection_id).map(|(value, value_24hr)| Valuation {
            value: *value,
            value_24hr: *value_24hr,
            value_secondary: None,
            resolved_at: Utc::now(),
            venue: Venue::Synthetic,
        })
    }
}
