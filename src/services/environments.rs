//! Per-network environment registry.
//!
//! Maps a network identifier to the environment bundle and image of each
//! service role. Built once at process start and read-only afterwards.

use crate::domain::models::Role;
use crate::services::settings::NetworkOverrides;
use std::collections::BTreeMap;

pub type EnvironmentBundle = BTreeMap<String, String>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}

#[derive(Debug, Clone)]
pub struct NetworkProfile {
    pub tomochain: EnvironmentBundle,
    pub metrics: EnvironmentBundle,
    pub tomochain_image: String,
    pub metrics_image: String,
}

impl NetworkProfile {
    fn bundle(&self, role: Role) -> &EnvironmentBundle {
        match role {
            Role::Tomochain => &self.tomochain,
            Role::Metrics => &self.metrics,
        }
    }

    fn bundle_mut(&mut self, role: Role) -> &mut EnvironmentBundle {
        match role {
            Role::Tomochain => &mut self.tomochain,
            Role::Metrics => &mut self.metrics,
        }
    }

    fn image(&self, role: Role) -> &str {
        match role {
            Role::Tomochain => &self.tomochain_image,
            Role::Metrics => &self.metrics_image,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentRegistry {
    networks: BTreeMap<String, NetworkProfile>,
}

impl EnvironmentRegistry {
    pub fn builtin() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            "mainnet".to_string(),
            profile(
                "88",
                "stats.tomochain.com",
                "bootnodes.tomochain.com:30301",
                "https://metrics.tomochain.com",
                "stable",
            ),
        );
        networks.insert(
            "testnet".to_string(),
            profile(
                "89",
                "stats.testnet.tomochain.com",
                "bootnodes.testnet.tomochain.com:30301",
                "https://metrics.testnet.tomochain.com",
                "testnet",
            ),
        );
        networks.insert(
            "devnet".to_string(),
            profile(
                "90",
                "stats.devnet.tomochain.com",
                "bootnodes.devnet.tomochain.com:30301",
                "https://metrics.devnet.tomochain.com",
                "devnet",
            ),
        );
        Self { networks }
    }

    /// Merge per-network overrides from the settings file.
    ///
    /// Overrides may only touch networks the registry already knows.
    pub fn with_overrides(
        mut self,
        overrides: &BTreeMap<String, NetworkOverrides>,
    ) -> Result<Self, RegistryError> {
        for (net, o) in overrides {
            let Some(profile) = self.networks.get_mut(net) else {
                return Err(RegistryError::UnknownNetwork(net.clone()));
            };
            for role in Role::ALL {
                profile
                    .bundle_mut(role)
                    .extend(o.env(role).iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            if let Some(image) = &o.images.tomochain {
                profile.tomochain_image = image.clone();
            }
            if let Some(image) = &o.images.metrics {
                profile.metrics_image = image.clone();
            }
        }
        Ok(self)
    }

    pub fn contains(&self, net: &str) -> bool {
        self.networks.contains_key(net)
    }

    pub fn networks(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }

    pub fn lookup(&self, net: &str, role: Role) -> Result<&EnvironmentBundle, RegistryError> {
        self.profile(net).map(|p| p.bundle(role))
    }

    pub fn image(&self, net: &str, role: Role) -> Result<&str, RegistryError> {
        self.profile(net).map(|p| p.image(role))
    }

    fn profile(&self, net: &str) -> Result<&NetworkProfile, RegistryError> {
        self.networks
            .get(net)
            .ok_or_else(|| RegistryError::UnknownNetwork(net.to_string()))
    }
}

fn profile(
    network_id: &str,
    stats_host: &str,
    bootnodes: &str,
    metrics_endpoint: &str,
    tag: &str,
) -> NetworkProfile {
    let tomochain = [
        ("BOOTNODES", bootnodes),
        ("NETSTATS_HOST", stats_host),
        ("NETSTATS_PORT", "443"),
        ("NETWORK_ID", network_id),
        ("WS_SECRET", "getty-site-pass"),
    ];
    NetworkProfile {
        tomochain: tomochain
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        metrics: [("METRICS_ENDPOINT".to_string(), metrics_endpoint.to_string())]
            .into_iter()
            .collect(),
        tomochain_image: format!("tomochain/node:{tag}"),
        metrics_image: format!("tomochain/telegraf:{tag}"),
    }
}
