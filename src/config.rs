use crate::error::BridgeError;
use std::env;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

pub const DEFAULT_INBOUND_PORT: u16 = 2901;
pub const DEFAULT_SCRAPE_PORT: u16 = 9550;

/// Listener configuration for the bridge, read from the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    pub bind_address: Ipv4Addr,
    /// Port the device connects to and streams frames on
    pub inbound_port: u16,
    /// Port serving `/metrics`
    pub scrape_port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_address: Ipv4Addr::UNSPECIFIED,
            inbound_port: DEFAULT_INBOUND_PORT,
            scrape_port: DEFAULT_SCRAPE_PORT,
        }
    }
}

impl BridgeConfig {
    /// Reads `BIND_ADDRESS`, `INBOUND_PORT` and `SCRAPE_PORT`, falling back to defaults when unset
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            bind_address: parse_or_default(&lookup, "BIND_ADDRESS", defaults.bind_address)?,
            inbound_port: parse_or_default(&lookup, "INBOUND_PORT", defaults.inbound_port)?,
            scrape_port: parse_or_default(&lookup, "SCRAPE_PORT", defaults.scrape_port)?,
        })
    }

    pub fn inbound_addr(&self) -> SocketAddr {
        SocketAddrV4::new(self.bind_address, self.inbound_port).into()
    }

    pub fn scrape_addr(&self) -> SocketAddr {
        SocketAddrV4::new(self.bind_address, self.scrape_port).into()
    }
}

/// Unset or blank values take the default; anything else must parse
fn parse_or_default<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, BridgeError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| BridgeError::Config { key, value: raw }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = BridgeConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.inbound_addr().to_string(), "0.0.0.0:2901");
        assert_eq!(config.scrape_addr().to_string(), "0.0.0.0:9550");
    }

    #[test]
    fn test_overrides() {
        let config = BridgeConfig::from_lookup(lookup_from(&[
            ("BIND_ADDRESS", "127.0.0.1"),
            ("INBOUND_PORT", " 4000 "),
            ("SCRAPE_PORT", "9100"),
        ]))
        .unwrap();
        assert_eq!(config.inbound_addr().to_string(), "127.0.0.1:4000");
        assert_eq!(config.scrape_addr().to_string(), "127.0.0.1:9100");
    }

    #[test]
    fn test_blank_value_uses_default() {
        let config = BridgeConfig::from_lookup(lookup_from(&[("SCRAPE_PORT", "")])).unwrap();
        assert_eq!(config.scrape_port, DEFAULT_SCRAPE_PORT);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = BridgeConfig::from_lookup(lookup_from(&[("INBOUND_PORT", "70000")]))
            .unwrap_err();
        match err {
            BridgeError::Config { key, value } => {
                assert_eq!(key, "INBOUND_PORT");
                assert_eq!(value, "70000");
            }
            other => panic!("Expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_bind_address_is_rejected() {
        let result = BridgeConfig::from_lookup(lookup_from(&[("BIND_ADDRESS", "localhost")]));
        assert!(matches!(
            result,
            Err(BridgeError::Config {
                key: "BIND_ADDRESS",
                ..
            })
        ));
    }
}
