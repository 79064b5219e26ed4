//! Join validation: domain allow-list, country policy, proxy lookup
//! and one-connection-per-address, evaluated in that order with the
//! first failure winning.

use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashSet;
use parking_lot::RwLock;
use serde::Deserialize;

use limbogate_proto::version::Version;

use super::CheckVerdict;
use crate::lookup::{GeoLookup, ProxyLookup};
use crate::reason::BlockReason;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JoinSettings {
    /// Hostnames clients must have connected through. Empty list
    /// disables the check.
    pub allowed_domains: Vec<String>,
    /// Country codes (ISO alpha-2) on the list below.
    pub countries: Vec<String>,
    /// If true, `countries` is an allow-list; otherwise a deny-list.
    pub country_whitelist: bool,
    pub proxy_check: bool,
    pub one_connection_per_address: bool,
}

impl Default for JoinSettings {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            countries: Vec::new(),
            country_whitelist: false,
            proxy_check: true,
            one_connection_per_address: true,
        }
    }
}

/// Normalized handshake-to-login facts a join decision needs.
#[derive(Debug, Clone)]
pub struct JoinInfo {
    pub address: IpAddr,
    pub host: String,
    pub version: Version,
}

pub struct JoinCheck {
    settings: RwLock<JoinSettings>,
    geo: Arc<dyn GeoLookup>,
    proxy: Arc<dyn ProxyLookup>,
    online_addresses: DashSet<IpAddr>,
}

impl JoinCheck {
    pub fn new(settings: JoinSettings, geo: Arc<dyn GeoLookup>, proxy: Arc<dyn ProxyLookup>) -> Self {
        Self {
            settings: RwLock::new(settings),
            geo,
            proxy,
            online_addresses: DashSet::new(),
        }
    }

    pub fn reload(&self, settings: JoinSettings) {
        *self.settings.write() = settings;
    }

    pub fn evaluate(&self, info: &JoinInfo) -> CheckVerdict {
        let settings = self.settings.read();

        if !settings.allowed_domains.is_empty() {
            let host = normalize_host(&info.host);
            if !settings
                .allowed_domains
                .iter()
                .any(|d| d.eq_ignore_ascii_case(&host))
            {
                return CheckVerdict::Fail(BlockReason::InvalidHost);
            }
        }

        if !settings.countries.is_empty() {
            if let Some(country) = self.geo.country(info.address) {
                let listed = settings
                    .countries
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&country));
                if listed != settings.country_whitelist {
                    return CheckVerdict::Fail(BlockReason::Country);
                }
            }
        }

        if settings.proxy_check && self.proxy.is_proxy(info.address) {
            return CheckVerdict::Fail(BlockReason::Proxy);
        }

        if settings.one_connection_per_address && self.online_addresses.contains(&info.address) {
            return CheckVerdict::Fail(BlockReason::AlreadyOnline);
        }

        CheckVerdict::Pass
    }

    /// Atomically claim the address for a session. Two connections
    /// racing between handshake and login cannot both hold it: the
    /// insert decides, not an earlier read.
    pub fn claim(&self, address: IpAddr) -> CheckVerdict {
        let newly_claimed = self.online_addresses.insert(address);
        if !newly_claimed && self.settings.read().one_connection_per_address {
            return CheckVerdict::Fail(BlockReason::AlreadyOnline);
        }
        CheckVerdict::Pass
    }

    pub fn unregister(&self, address: IpAddr) {
        self.online_addresses.remove(&address);
    }
}

/// Strip the FML marker and any trailing dot some clients append.
fn normalize_host(host: &str) -> String {
    let host = host.split('\0').next().unwrap_or(host);
    host.trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::AllowAll;

    fn check(settings: JoinSettings) -> JoinCheck {
        JoinCheck::new(settings, Arc::new(AllowAll), Arc::new(AllowAll))
    }

    fn info(address: &str, host: &str) -> JoinInfo {
        JoinInfo {
            address: address.parse().unwrap(),
            host: host.into(),
            version: Version::V1_20,
        }
    }

    #[test]
    fn empty_domain_list_allows_any_host() {
        let check = check(JoinSettings::default());
        assert!(check.evaluate(&info("1.2.3.4", "whatever.net")).passed());
    }

    #[test]
    fn domain_allowlist_is_case_insensitive_and_strips_fml() {
        let check = check(JoinSettings {
            allowed_domains: vec!["play.example.net".into()],
            ..JoinSettings::default()
        });
        assert!(check.evaluate(&info("1.2.3.4", "Play.Example.Net")).passed());
        assert!(check
            .evaluate(&info("1.2.3.4", "play.example.net\0FML\0"))
            .passed());
        assert_eq!(
            check.evaluate(&info("1.2.3.4", "evil.example.org")),
            CheckVerdict::Fail(BlockReason::InvalidHost)
        );
    }

    #[test]
    fn duplicate_address_rejected_until_unregistered() {
        let check = check(JoinSettings::default());
        assert!(check.claim("9.9.9.9".parse().unwrap()).passed());
        assert_eq!(
            check.evaluate(&info("9.9.9.9", "h")),
            CheckVerdict::Fail(BlockReason::AlreadyOnline)
        );
        check.unregister("9.9.9.9".parse().unwrap());
        assert!(check.evaluate(&info("9.9.9.9", "h")).passed());
    }

    #[test]
    fn second_claim_loses_the_race() {
        let check = check(JoinSettings::default());
        let address: IpAddr = "5.5.5.5".parse().unwrap();
        assert!(check.claim(address).passed());
        assert_eq!(
            check.claim(address),
            CheckVerdict::Fail(BlockReason::AlreadyOnline)
        );
        check.unregister(address);
        assert!(check.claim(address).passed());
    }

    #[test]
    fn claim_never_rejects_when_policy_disabled() {
        let check = check(JoinSettings {
            one_connection_per_address: false,
            ..JoinSettings::default()
        });
        let address: IpAddr = "6.6.6.6".parse().unwrap();
        assert!(check.claim(address).passed());
        assert!(check.claim(address).passed());
    }

    #[test]
    fn country_deny_list() {
        struct FixedGeo;
        impl GeoLookup for FixedGeo {
            fn country(&self, _a: IpAddr) -> Option<String> {
                Some("ZZ".into())
            }
        }
        let check = JoinCheck::new(
            JoinSettings {
                countries: vec!["zz".into()],
                country_whitelist: false,
                ..JoinSettings::default()
            },
            Arc::new(FixedGeo),
            Arc::new(AllowAll),
        );
        assert_eq!(
            check.evaluate(&info("1.2.3.4", "h")),
            CheckVerdict::Fail(BlockReason::Country)
        );
    }

    #[test]
    fn proxy_membership_rejected() {
        struct AlwaysProxy;
        impl ProxyLookup for AlwaysProxy {
            fn is_proxy(&self, _a: IpAddr) -> bool {
                true
            }
        }
        let check = JoinCheck::new(
            JoinSettings::default(),
            Arc::new(AllowAll),
            Arc::new(AlwaysProxy),
        );
        assert_eq!(
            check.evaluate(&info("1.2.3.4", "h")),
            CheckVerdict::Fail(BlockReason::Proxy)
        );
    }
}
