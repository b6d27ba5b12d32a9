//! Loading configuration text from a locator and writing it back.

use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use crates_uri::UriExt;
use http::Uri;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    types::Config,
};

/// Where a configuration comes from: a local file or an `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Path(PathBuf),
    Remote(Uri),
}

impl Locator {
    /// Interprets `raw` as a URL when it has an `http`, `https` or `file`
    /// scheme, and as a filesystem path otherwise.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(path) = raw.strip_prefix("file://") {
            if path.is_empty() {
                return Err(Error::unavailable(raw, "empty file path"));
            }
            return Ok(Locator::Path(PathBuf::from(path)));
        }

        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let uri: Uri = raw.parse().map_err(|e| Error::unavailable(raw, e))?;
            return Ok(Locator::Remote(uri));
        }

        if raw.is_empty() {
            return Err(Error::unavailable(raw, "empty locator"));
        }
        Ok(Locator::Path(PathBuf::from(raw)))
    }

    /// The local file behind this locator, if any.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Locator::Path(path) => Some(path),
            Locator::Remote(_) => None,
        }
    }

    /// Reads the whole resource as UTF-8 text.
    pub fn read_to_string(&self) -> Result<String> {
        match self {
            Locator::Path(path) => {
                debug!(path = %path.display(), "reading config file");
                fs::read_to_string(path).map_err(|e| Error::unavailable(self, e))
            }
            Locator::Remote(uri) => {
                debug!(%uri, endpoint = ?uri.host_port(), "fetching config");
                let response = reqwest::blocking::get(uri.to_string())
                    .and_then(|response| response.error_for_status())
                    .map_err(|e| Error::unavailable(self, e))?;
                response.text().map_err(|e| Error::unavailable(self, e))
            }
        }
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        Locator::parse(raw)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Path(path) => write!(f, "{}", path.display()),
            Locator::Remote(uri) => write!(f, "{uri}"),
        }
    }
}

/// Reads and parses the configuration behind `locator`.
pub fn read_config(locator: &Locator) -> Result<Config> {
    let text = locator.read_to_string()?;
    let config = crate::parse_config(&text)?;
    info!(
        %locator,
        upstreams = config.upstreams().len(),
        servers = config.servers().len(),
        "loaded config"
    );
    Ok(config)
}

impl Config {
    /// Replaces the file at `path` with the rendered configuration.
    ///
    /// The text goes to a temporary file in the same directory first, which
    /// is then renamed over `path`. An existing file keeps its permissions.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let failed = |source| Error::WriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir).map_err(failed)?;
        file.write_all(self.to_string().as_bytes()).map_err(failed)?;
        file.as_file().sync_all().map_err(failed)?;

        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(file.path(), metadata.permissions()).map_err(failed)?;
        }

        file.persist(path).map_err(|e| failed(e.error))?;
        info!(path = %path.display(), "wrote config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use claims::{assert_err, assert_matches, assert_ok};
    use rstest::rstest;
    use tempfile::TempDir;

    use super::{read_config, Locator};
    use crate::{parse_config, Error};

    const MINIMAL: &str = "http {\n    server {\n        server_name w;\n        listen 80;\n    }\n}\n";

    #[rstest]
    #[case("/etc/nginx/nginx.conf", "/etc/nginx/nginx.conf")]
    #[case("file:///etc/nginx/nginx.conf", "/etc/nginx/nginx.conf")]
    #[case("nginx.conf", "nginx.conf")]
    fn test_parse_path_locator(#[case] raw: &str, #[case] path: &str) {
        let locator = assert_ok!(Locator::parse(raw));
        assert_eq!(locator, Locator::Path(PathBuf::from(path)));
        assert_eq!(locator.as_path(), Some(PathBuf::from(path).as_path()));
    }

    #[rstest]
    #[case("http://config.local/nginx.conf")]
    #[case("HTTPS://config.local:8443/nginx.conf")]
    fn test_parse_remote_locator(#[case] raw: &str) {
        let locator = assert_ok!(Locator::parse(raw));
        assert_matches!(locator, Locator::Remote(_));
    }

    #[rstest]
    #[case("")]
    #[case("file://")]
    #[case("http://bad host/")]
    fn test_parse_locator_fail(#[case] raw: &str) {
        assert_matches!(Locator::parse(raw), Err(Error::ResourceUnavailable { .. }));
    }

    #[test]
    fn test_read_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let locator = Locator::Path(dir.path().join("missing.conf"));

        let error = assert_err!(read_config(&locator));
        assert_matches!(&error, Error::ResourceUnavailable { .. });
        assert!(error.to_string().contains("missing.conf"));
    }

    #[test]
    fn test_read_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nginx.conf");
        fs::write(&path, MINIMAL).unwrap();

        let config = assert_ok!(read_config(&Locator::Path(path)));
        assert_eq!(config.servers()[0].name(), "w");
    }

    #[test]
    fn test_write_to_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nginx.conf");
        fs::write(&path, "old contents").unwrap();

        let config = parse_config(MINIMAL).unwrap();
        assert_ok!(config.write_to(&path));

        assert_eq!(fs::read_to_string(&path).unwrap(), MINIMAL);
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("nginx.conf");

        let config = parse_config(MINIMAL).unwrap();
        let error = assert_err!(config.write_to(&path));
        assert_matches!(error, Error::WriteFailed { .. });
    }
}
