use http::{
    uri::{InvalidUri, Scheme},
    Uri,
};
use thiserror::Error;

/// Reasons an absolute URI cannot be split into its parts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriError {
    #[error("{0}")]
    Invalid(String),
    #[error("missing scheme")]
    MissingScheme,
    #[error("missing host")]
    MissingHost,
    #[error("user info is not supported")]
    UserInfo,
}

/// Returns the port a client uses when the URI names none: 443 for HTTPS, 80 otherwise.
pub fn default_port(scheme: &str) -> u16 {
    if scheme.eq_ignore_ascii_case(Scheme::HTTPS.as_str()) {
        443
    } else {
        80
    }
}

/// Extension trait for `Uri` to provide additional functionality.
pub trait UriExt {
    /// Retrieves the port number from the `Uri`.
    ///
    /// If the `Uri` does not explicitly specify a port, this method returns the default port
    /// for the scheme: 443 for HTTPS and 80 for HTTP.
    ///
    /// # Examples
    ///
    /// ```
    /// use crates_uri::UriExt;
    /// use http::Uri;
    ///
    /// let uri: Uri = "https://example.com".parse().unwrap();
    /// assert_eq!(uri.get_port(), 443);
    ///
    /// let uri: Uri = "http://example.com:8080".parse().unwrap();
    /// assert_eq!(uri.get_port(), 8080);
    /// ```
    fn get_port(&self) -> u16;

    /// `host:port` with the port defaulted by scheme, `None` when the URI has no host.
    fn host_port(&self) -> Option<String>;
}

impl UriExt for Uri {
    fn get_port(&self) -> u16 {
        self.port_u16()
            .unwrap_or_else(|| default_port(self.scheme_str().unwrap_or("http")))
    }

    fn host_port(&self) -> Option<String> {
        self.host().map(|host| format!("{host}:{}", self.get_port()))
    }
}

/// An absolute URI split into scheme, host, explicit port and the verbatim remainder.
///
/// `Uri::path` reports `/` for both `http://a` and `http://a/`, so the remainder
/// after the authority is sliced out of the raw text instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteParts<'a> {
    pub scheme: &'a str,
    pub host: &'a str,
    pub port: Option<u16>,
    pub tail: &'a str,
}

/// Splits `raw` into [`AbsoluteParts`], requiring a scheme and a non-empty host.
///
/// ```
/// let parts = crates_uri::split_absolute("http://backend:8080/api?x=1").unwrap();
/// assert_eq!(parts.scheme, "http");
/// assert_eq!(parts.host, "backend");
/// assert_eq!(parts.port, Some(8080));
/// assert_eq!(parts.tail, "/api?x=1");
/// ```
pub fn split_absolute(raw: &str) -> Result<AbsoluteParts<'_>, UriError> {
    let uri: Uri = raw
        .parse()
        .map_err(|err: InvalidUri| UriError::Invalid(err.to_string()))?;

    let scheme_len = uri.scheme_str().ok_or(UriError::MissingScheme)?.len();
    let authority = uri.authority().ok_or(UriError::MissingHost)?;
    if authority.host().is_empty() {
        return Err(UriError::MissingHost);
    }

    let scheme = &raw[..scheme_len];
    let rest = &raw[scheme_len + "://".len()..];
    let authority_len = authority.as_str().len();
    if rest[..authority_len].contains('@') {
        return Err(UriError::UserInfo);
    }
    let host = &rest[..authority.host().len()];

    // `port_u16` is also `None` for an empty or out-of-range port.
    let port = match rest[host.len()..authority_len].strip_prefix(':') {
        Some(digits) => Some(
            authority
                .port_u16()
                .ok_or_else(|| UriError::Invalid(format!("invalid port '{digits}'")))?,
        ),
        None => None,
    };

    Ok(AbsoluteParts {
        scheme,
        host,
        port,
        tail: &rest[authority_len..],
    })
}
