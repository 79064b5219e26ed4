//! External lookup seams for the join check. The real geo/proxy data
//! sources live outside this crate; connections must never block on
//! them, so implementations are expected to answer from a local cache.

use std::net::IpAddr;

/// Country resolution for an address, ISO 3166-1 alpha-2.
pub trait GeoLookup: Send + Sync {
    fn country(&self, address: IpAddr) -> Option<String>;
}

/// Proxy/VPN membership for an address.
pub trait ProxyLookup: Send + Sync {
    fn is_proxy(&self, address: IpAddr) -> bool;
}

/// Default lookup that knows nothing and never blocks anyone.
pub struct AllowAll;

impl GeoLookup for AllowAll {
    fn country(&self, _address: IpAddr) -> Option<String> {
        None
    }
}

impl ProxyLookup for AllowAll {
    fn is_proxy(&self, _address: IpAddr) -> bool {
        false
    }
}
