//! Request attributes seen by ACL rules and selection algorithms.

use std::collections::HashMap;
use std::net::IpAddr;

/// Synthetic request: the attributes routing decisions depend on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAttributes {
    pub host: Option<String>,
    pub path: String,
    /// Header names are stored lowercase.
    headers: HashMap<String, String>,
    pub src_ip: Option<IpAddr>,
}

impl RequestAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_src_ip(mut self, ip: IpAddr) -> Self {
        self.src_ip = Some(ip);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let req = RequestAttributes::new("/").with_header("X-Tenant", "acme");
        assert_eq!(req.header("x-tenant"), Some("acme"));
        assert_eq!(req.header("X-TENANT"), Some("acme"));
        assert_eq!(req.header("x-other"), None);
    }
}
