use std::{cmp::Ordering, str::FromStr};

use crates_uri::{default_port, split_absolute, UriError};

use crate::{error::Error, order, values};

/// A parsed configuration file.
///
/// `before` holds everything up to the first recognized child of the `http`
/// block, `after` everything following the last one, both verbatim.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Config {
    pub(crate) before: String,
    pub(crate) after: String,
    pub(crate) upstreams: Vec<Upstream>,
    pub(crate) servers: Vec<Server>,
}

/// A named pool of backend targets used for load balancing.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Upstream {
    pub(crate) name: String,
    pub(crate) method: Option<String>,
    pub(crate) before: String,
    pub(crate) after: String,
    pub(crate) host_ports: Vec<HostPort>,
}

/// A backend address inside an upstream.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct HostPort {
    pub(crate) host: String,
    pub(crate) port: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Server {
    pub(crate) name: String,
    pub(crate) listen: u16,
    pub(crate) before: String,
    pub(crate) after: String,
    pub(crate) locations: Vec<Location>,
}

/// A path-scoped routing rule, optionally forwarding to a [`ProxyTarget`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Location {
    pub(crate) path: String,
    pub(crate) before: String,
    pub(crate) after: String,
    pub(crate) proxy_target: Option<ProxyTarget>,
}

/// The value of a `proxy_pass` directive.
///
/// `host` is either a real host or the name of an [`Upstream`]. `path` keeps
/// everything after the authority verbatim, query included.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProxyTarget {
    pub(crate) scheme: String,
    pub(crate) host: String,
    pub(crate) port: Option<u16>,
    pub(crate) path: Option<String>,
}

impl Config {
    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn after(&self) -> &str {
        &self.after
    }

    pub fn upstreams(&self) -> &[Upstream] {
        &self.upstreams
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// The upstream a proxy target forwards to, if its host names one.
    pub fn upstream_for(&self, target: &ProxyTarget) -> Option<&Upstream> {
        if target.port.is_some() {
            return None;
        }
        self.upstreams.iter().find(|upstream| upstream.name == target.host)
    }

    /// The server whose `server_name` and `listen` port match `host_port`.
    pub fn server_for(&self, host_port: &HostPort) -> Option<&Server> {
        self.servers.iter().find(|server| host_port.matches(server))
    }
}

impl Upstream {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: None,
            before: String::new(),
            after: String::new(),
            host_ports: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn after(&self) -> &str {
        &self.after
    }

    pub fn host_ports(&self) -> &[HostPort] {
        &self.host_ports
    }
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether `server` answers for this address.
    pub fn matches(&self, server: &Server) -> bool {
        server.name == self.host && server.listen == self.port
    }
}

impl Ord for HostPort {
    fn cmp(&self, other: &Self) -> Ordering {
        order::by_host_then_port(self, other)
    }
}

impl PartialOrd for HostPort {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&ProxyTarget> for HostPort {
    fn from(target: &ProxyTarget) -> Self {
        HostPort::new(target.host.clone(), target.port_or_default())
    }
}

impl FromStr for HostPort {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        values::host_port(value)
            .map(|(host, port)| HostPort::new(host, port))
            .map_err(|reason| Error::InvalidValue {
                kind: "host:port",
                value: value.to_string(),
                reason,
            })
    }
}

impl Server {
    pub fn new(name: impl Into<String>, listen: u16) -> Self {
        Self {
            name: name.into(),
            listen,
            before: String::new(),
            after: String::new(),
            locations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn listen(&self) -> u16 {
        self.listen
    }

    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn after(&self) -> &str {
        &self.after
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            before: String::new(),
            after: String::new(),
            proxy_target: None,
        }
    }

    /// A location that does nothing but forward to `target`.
    pub fn proxied(path: impl Into<String>, target: ProxyTarget) -> Self {
        Self {
            proxy_target: Some(target),
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn after(&self) -> &str {
        &self.after
    }

    pub fn proxy_target(&self) -> Option<&ProxyTarget> {
        self.proxy_target.as_ref()
    }

    /// Whether this location forwards to `upstream` by name.
    pub fn references(&self, upstream: &Upstream) -> bool {
        self.proxy_target
            .as_ref()
            .is_some_and(|target| target.port.is_none() && target.host == upstream.name)
    }
}

impl ProxyTarget {
    pub(crate) fn parse(raw: &str) -> Result<Self, UriError> {
        let parts = split_absolute(raw)?;
        Ok(Self {
            scheme: parts.scheme.to_string(),
            host: parts.host.to_string(),
            port: parts.port,
            path: (!parts.tail.is_empty()).then(|| parts.tail.to_string()),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The explicit port, or the default one for the scheme.
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| default_port(&self.scheme))
    }
}

impl FromStr for ProxyTarget {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ProxyTarget::parse(value).map_err(|reason| Error::InvalidValue {
            kind: "proxy target",
            value: value.to_string(),
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_matches, assert_ok};
    use rstest::rstest;

    use super::{HostPort, Location, ProxyTarget, Server, Upstream};
    use crate::Error;

    #[test]
    fn test_host_port_orders_by_host_then_port() {
        let mut host_ports = vec![
            HostPort::new("b", 1),
            HostPort::new("a", 9),
            HostPort::new("a", 2),
        ];
        host_ports.sort();
        assert_eq!(
            host_ports,
            vec![
                HostPort::new("a", 2),
                HostPort::new("a", 9),
                HostPort::new("b", 1)
            ]
        );
    }

    #[test]
    fn test_host_port_from_str() {
        let host_port: HostPort = assert_ok!("localhost:8180".parse());
        assert_eq!(host_port, HostPort::new("localhost", 8180));

        let error = assert_err!("localhost:http".parse::<HostPort>());
        assert_matches!(error, Error::InvalidValue { kind: "host:port", .. });
    }

    #[test]
    fn test_host_port_matches_server() {
        let server = Server::new("worker01", 80);
        assert!(HostPort::new("worker01", 80).matches(&server));
        assert!(!HostPort::new("worker01", 8080).matches(&server));
        assert!(!HostPort::new("worker02", 80).matches(&server));
    }

    #[rstest]
    #[case("http://backend", "http", "backend", None, None)]
    #[case("http://localhost:8180/", "http", "localhost", Some(8180), Some("/"))]
    #[case("https://api/v1?debug=1", "https", "api", None, Some("/v1?debug=1"))]
    fn test_proxy_target_parse(
        #[case] raw: &str,
        #[case] scheme: &str,
        #[case] host: &str,
        #[case] port: Option<u16>,
        #[case] path: Option<&str>,
    ) {
        let target: ProxyTarget = raw.parse().unwrap();
        assert_eq!(target.scheme(), scheme);
        assert_eq!(target.host(), host);
        assert_eq!(target.port(), port);
        assert_eq!(target.path(), path);
    }

    #[rstest]
    #[case("not-a-valid-uri")]
    #[case("/local/path")]
    #[case("http://bad host")]
    #[case("http://h:99999")]
    #[case("http://h:")]
    #[case("http://user:pw@h:81/p")]
    fn test_proxy_target_parse_fail(#[case] raw: &str) {
        assert_matches!(
            raw.parse::<ProxyTarget>(),
            Err(Error::InvalidValue { kind: "proxy target", .. })
        );
    }

    #[rstest]
    #[case("http://backend", 80)]
    #[case("https://backend", 443)]
    #[case("http://backend:8080", 8080)]
    fn test_proxy_target_port_or_default(#[case] raw: &str, #[case] port: u16) {
        let target: ProxyTarget = raw.parse().unwrap();
        assert_eq!(target.port_or_default(), port);
        assert_eq!(HostPort::from(&target), HostPort::new("backend", port));
    }

    #[test]
    fn test_location_references_upstream() {
        let backend = Upstream::new("backend");
        let by_name = Location::proxied("/", "http://backend/foo".parse().unwrap());
        let by_port = Location::proxied("/", "http://backend:8080".parse().unwrap());
        let plain = Location::new("/static");

        assert!(by_name.references(&backend));
        assert!(!by_port.references(&backend));
        assert!(!plain.references(&backend));
    }
}
