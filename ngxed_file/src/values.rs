// Parsers for the values of recognized directives.

use nom::{
    branch::alt,
    bytes::complete::is_not,
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

/// Port assumed for an upstream `server` entry that names none.
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Upstream balancing methods that take no arguments.
pub(crate) const BALANCING_METHODS: [&str; 2] = ["least_conn", "ip_hash"];

// Parses "8080" into a port, rejecting values that do not fit in u16
fn port(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |digits: &str| digits.parse::<u16>())(input)
}

// Parses "localhost", "10.0.0.1" or a bracketed IPv6 address like "[::1]"
fn host(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(delimited(char('['), is_not("]"), char(']'))),
        is_not(":[]"),
    ))(input)
}

/// Port of a `listen` value: `80`, `0.0.0.0:80`, `*:80` or `[::]:80`.
pub(crate) fn listen_port(value: &str) -> Result<u16, String> {
    all_consuming(preceded(opt(terminated(host, char(':'))), port))(value)
        .map(|(_, port)| port)
        .map_err(|_| "expected a numeric port, optionally prefixed by `HOST:`".to_string())
}

/// Host and port of an upstream `server` value: `HOST` or `HOST:PORT`.
pub(crate) fn host_port(value: &str) -> Result<(String, u16), String> {
    all_consuming(pair(host, opt(preceded(char(':'), port))))(value)
        .map(|(_, (host, port))| (host.to_string(), port.unwrap_or(DEFAULT_HTTP_PORT)))
        .map_err(|_| "expected `HOST` or `HOST:PORT` with a numeric port".to_string())
}

/// Value of a single-valued directive with its `;` terminator stripped.
pub(crate) fn terminated_value(token: &str) -> Option<&str> {
    token.strip_suffix(';')
}

pub(crate) fn is_comment(token: &str) -> bool {
    token.starts_with('#')
}
