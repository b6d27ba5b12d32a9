#![cfg_attr(feature = "strict", deny(warnings))]

//! Round-trip preserving parser and editor for nginx configuration files.
//!
//! Only the `http` block's `upstream`, `server` and `location` structure is
//! modeled; every other directive, comment and blank line is carried along
//! as free text so that an unmodified file renders back unchanged.
//!
//! ```
//! use ngxed_file::{parse_config, HostPort};
//!
//! let text = "http {\n    upstream backend {\n        server localhost:8180;\n    }\n}\n";
//! let mut config = parse_config(text).unwrap();
//! assert_eq!(config.to_string(), text);
//!
//! config
//!     .upstream_mut("backend")
//!     .unwrap()
//!     .add_host_port(HostPort::new("localhost", 8280))
//!     .unwrap();
//! assert!(config.to_string().contains("server localhost:8280;"));
//! ```

use std::io::Read;

mod edit;
pub mod error;
pub mod order;
mod parser;
mod render;
pub mod source;
pub mod tokenizer;
pub mod types;
mod values;

pub use error::{BlockKind, Error, Result};
pub use source::{read_config, Locator};
pub use types::{Config, HostPort, Location, ProxyTarget, Server, Upstream};
pub use values::DEFAULT_HTTP_PORT;

/// Parses configuration text.
pub fn parse_config(input: &str) -> Result<Config> {
    parser::parse(input.chars())
}

/// Reads `reader` to the end and parses it.
pub fn parse_reader(mut reader: impl Read) -> Result<Config> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| Error::unavailable("reader", e))?;
    parse_config(&text)
}

#[cfg(test)]
mod tests {
    use claims::assert_ok;

    use super::{parse_config, parse_reader};

    #[test]
    fn test_parse_reader() {
        let text = "http {\n}\n";
        let config = assert_ok!(parse_reader(text.as_bytes()));
        assert_eq!(config, assert_ok!(parse_config(text)));
        assert_eq!(config.to_string(), text);
    }
}
