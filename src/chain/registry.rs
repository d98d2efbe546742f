//! Explicit chain client registry
//!
//! Constructed once at process start from the configuration and passed
//! through request contexts. Clients are created lazily on first use of a
//! network id and shared read-only afterwards; the registry itself never
//! exposes mutable state to callers.

use super::rpc::JsonRpcChainClient;
use super::ChainClient;
use crate::config::{Config, NetworkConfig};
use crate::errors::{LendingError, LendingResult};
use crate::logger::{self, LogTag};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub struct ClientRegistry {
    networks: HashMap<u64, NetworkConfig>,
    timeout: Duration,
    clients: RwLock<HashMap<u64, Arc<dyn ChainClient>>>,
}

impl ClientRegistry {
    pub fn from_config(config: &Config) -> Self {
        let networks = config
            .networks
            .iter()
            .map(|n| (n.network_id, n.clone()))
            .collect();

        Self {
            networks,
            timeout: Duration::from_millis(config.http.timeout_ms),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// The shared client for a network, creating it on first use
    pub fn client(&self, network_id: u64) -> LendingResult<Arc<dyn ChainClient>> {
        if let Ok(clients) = self.clients.read() {
            if let Some(client) = clients.get(&network_id) {
                return Ok(Arc::clone(client));
            }
        }

        let network = self.network(network_id)?;
        let client: Arc<dyn ChainClient> =
            Arc::new(JsonRpcChainClient::new(network, self.timeout)?);

        logger::info(
            LogTag::Chain,
            &format!("Created RPC client for network {} ({})", network.name, network_id),
        );

        let mut clients = self
            .clients
            .write()
            .map_err(|_| LendingError::Config("Client registry lock poisoned".to_string()))?;
        // A concurrent request may have created one in the meantime; keep the
        // first so every request on a network shares the same client.
        Ok(Arc::clone(
            clients.entry(network_id).or_insert(client),
        ))
    }

    /// Register a pre-built client for a network, e.g. a custom transport.
    /// Must happen before requests start; later lookups share this client.
    pub fn register(&self, network_id: u64, client: Arc<dyn ChainClient>) {
        if let Ok(mut clients) = self.clients.write() {
            clients.insert(network_id, client);
        }
    }

    pub fn network(&self, network_id: u64) -> LendingResult<&NetworkConfig> {
        self.networks
            .get(&network_id)
            .ok_or(LendingError::UnsupportedNetwork(network_id))
    }

    /// The designated per-network reserve pool used as routing fallback
    pub fn reserve_pool(&self, network_id: u64) -> LendingResult<Option<&str>> {
        Ok(self.network(network_id)?.reserve_pool.as_deref())
    }

    pub fn currency(&self, network_id: u64) -> LendingResult<&str> {
        Ok(self.network(network_id)?.currency.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn sample_config() -> Config {
        Config::from_toml_str(
            r#"
            [[networks]]
            name = "mainnet"
            network_id = 1
            rpc_url = "https://rpc.example.org"
            control_plane = "0xcontrol"
            reserve_pool = "0xreserve"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_one_client_per_network() {
        let registry = ClientRegistry::from_config(&sample_config());
        let a = registry.client(1).unwrap();
        let b = registry.client(1).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_network() {
        let registry = ClientRegistry::from_config(&sample_config());
        assert!(matches!(
            registry.client(42),
            Err(LendingError::UnsupportedNetwork(42))
        ));
        assert_eq!(registry.reserve_pool(1).unwrap(), Some("0xreserve"));
        assert_eq!(registry.currency(1).unwrap(), "ETH");
    }
}
