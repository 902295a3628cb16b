//! Control-plane configuration
//!
//! ```yaml
//! insert_policy: lookup_only      # or lookup_or_insert
//! license: GPL
//! known_hosts:
//!   - 10.0.0.1
//!   - 192.168.1.20
//! ```

use crate::{HostcountError, Result};
use hostcount_common::{InsertPolicy, License, COUNTER_CAPACITY};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::debug;

/// Insert policy as written in configuration and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    #[default]
    LookupOnly,
    LookupOrInsert,
}

impl From<Policy> for InsertPolicy {
    fn from(p: Policy) -> Self {
        match p {
            Policy::LookupOnly => InsertPolicy::LookupOnly,
            Policy::LookupOrInsert => InsertPolicy::LookupOrInsert,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlPlaneConfig {
    pub insert_policy: Policy,
    pub license: String,
    pub known_hosts: Vec<Ipv4Addr>,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            insert_policy: Policy::LookupOnly,
            license: License::GPL.as_str().to_string(),
            known_hosts: Vec::new(),
        }
    }
}

impl ControlPlaneConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading control-plane config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.known_hosts.len() > COUNTER_CAPACITY {
            return Err(HostcountError::ConfigError(format!(
                "{} known hosts exceed the counting table capacity of {}",
                self.known_hosts.len(),
                COUNTER_CAPACITY
            )));
        }
        if self.license.trim().is_empty() {
            return Err(HostcountError::ConfigError(
                "license must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = ControlPlaneConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ControlPlaneConfig::default());
        assert_eq!(config.license, "GPL");
    }

    #[test]
    fn test_parse_full_config() {
        let config = ControlPlaneConfig::from_yaml_str(
            "insert_policy: lookup_or_insert\nlicense: Dual MIT/GPL\nknown_hosts:\n  - 10.0.0.1\n  - 192.168.1.20\n",
        )
        .unwrap();

        assert_eq!(config.insert_policy, Policy::LookupOrInsert);
        assert_eq!(config.license, "Dual MIT/GPL");
        assert_eq!(
            config.known_hosts,
            vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(192, 168, 1, 20)]
        );
    }

    #[test]
    fn test_invalid_address_rejected() {
        let err = ControlPlaneConfig::from_yaml_str("known_hosts: [\"10.0.0.300\"]").unwrap_err();
        assert!(matches!(err, HostcountError::YamlError(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ControlPlaneConfig::from_yaml_str("capacity: 2048").is_err());
    }

    #[test]
    fn test_too_many_hosts() {
        let config = ControlPlaneConfig {
            known_hosts: (0..=COUNTER_CAPACITY as u32).map(Ipv4Addr::from).collect(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HostcountError::ConfigError(_))
        ));
    }
}
