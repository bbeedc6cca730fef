// src/registry/record.rs
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use url::Url;

pub const SCHEME: &str = "http";

/// One endpoint as reported by a discovery provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub priority: i32,
}

impl Candidate {
    pub fn new(id: impl Into<String>, address: impl Into<String>, port: u16, priority: i32) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            port,
            priority,
        }
    }
}

/// A known backend. Values handed out by the registry are copies; mutating one
/// does not affect the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub id: String,
    pub address: String,
    pub port: u16,
    /// Lower is preferred.
    pub priority: i32,
    pub last_seen: DateTime<Utc>,
    pub healthy: bool,
}

impl ServiceRecord {
    pub(crate) fn discovered(candidate: Candidate, seen_at: DateTime<Utc>) -> Self {
        Self {
            id: candidate.id,
            address: candidate.address,
            port: candidate.port,
            priority: candidate.priority,
            last_seen: seen_at,
            healthy: false,
        }
    }

    /// Always derived from `address` and `port`, never stored.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", SCHEME, self.address, self.port)
    }

    /// Absolute URL of `path` on this service, e.g. `/api/tags`. IPv6 literals
    /// are bracketed here even though `url()` leaves them bare.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = Url::parse(&format!("{}://localhost/", SCHEME))?;
        match self.address.parse::<IpAddr>() {
            Ok(ip) => base
                .set_ip_host(ip)
                .map_err(|_| anyhow!("invalid host {}", self.address))?,
            Err(_) => base.set_host(Some(&self.address))?,
        }
        base.set_port(Some(self.port))
            .map_err(|_| anyhow!("invalid port {}", self.port))?;
        Ok(base.join(path)?)
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(address: &str, port: u16) -> ServiceRecord {
        ServiceRecord::discovered(Candidate::new("svc", address, port, 50), Utc::now())
    }

    #[test]
    fn test_new_record_starts_unhealthy() {
        assert!(!record("127.0.0.1", 11434).healthy);
    }

    #[test]
    fn test_url_follows_address_and_port() {
        let mut rec = record("127.0.0.1", 11434);
        assert_eq!(rec.url(), "http://127.0.0.1:11434");

        rec.address = "10.0.0.7".to_string();
        rec.port = 8000;
        assert_eq!(rec.url(), "http://10.0.0.7:8000");
    }

    #[test]
    fn test_endpoint_joins_path() {
        let rec = record("127.0.0.1", 11434);
        assert_eq!(
            rec.endpoint("/api/chat").unwrap().as_str(),
            "http://127.0.0.1:11434/api/chat"
        );
    }

    #[test]
    fn test_endpoint_brackets_ipv6_literal() {
        let rec = record("::1", 11434);
        assert_eq!(rec.url(), "http://::1:11434");
        assert_eq!(
            rec.endpoint("/api/tags").unwrap().as_str(),
            "http://[::1]:11434/api/tags"
        );
    }

    #[test]
    fn test_endpoint_accepts_hostname() {
        let rec = record("gpu-box.local", 8000);
        assert_eq!(
            rec.endpoint("/v1/models").unwrap().as_str(),
            "http://gpu-box.local:8000/v1/models"
        );
    }

    proptest! {
        #[test]
        fn url_is_scheme_address_port(a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255, port in 1u16..) {
            let address = format!("{}.{}.{}.{}", a, b, c, d);
            let rec = record(&address, port);
            prop_assert_eq!(rec.url(), format!("http://{}:{}", address, port));
        }
    }
}
