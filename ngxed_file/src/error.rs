use std::{fmt, io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The block a problem was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Root,
    Http,
    Upstream,
    Server,
    Location,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockKind::Root => "top-level",
            BlockKind::Http => "http",
            BlockKind::Upstream => "upstream",
            BlockKind::Server => "server",
            BlockKind::Location => "location",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The input locator cannot be opened or read.
    #[error("can't load config from '{locator}': {reason}")]
    ResourceUnavailable { locator: String, reason: String },

    /// A recognized directive carries a value that does not parse.
    #[error("line {line}: malformed `{directive}` value '{value}' in {block} block: {reason}")]
    MalformedDirective {
        block: BlockKind,
        directive: &'static str,
        value: String,
        line: usize,
        reason: String,
    },

    /// Braces or block headers that do not fit the supported grammar.
    #[error("line {line}: unexpected structure in {block} block: {reason}")]
    UnexpectedStructure {
        block: BlockKind,
        line: usize,
        reason: String,
    },

    /// A value given outside of any file, e.g. on the command line, does not parse.
    #[error("invalid {kind} '{value}': {reason}")]
    InvalidValue {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("can't write config to '{}': {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },
}

impl Error {
    pub(crate) fn malformed(
        block: BlockKind,
        directive: &'static str,
        value: &str,
        line: usize,
        reason: impl Into<String>,
    ) -> Self {
        Error::MalformedDirective {
            block,
            directive,
            value: value.to_string(),
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn unexpected(block: BlockKind, line: usize, reason: impl Into<String>) -> Self {
        Error::UnexpectedStructure {
            block,
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, key: impl fmt::Display) -> Self {
        Error::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn already_exists(kind: &'static str, key: impl fmt::Display) -> Self {
        Error::AlreadyExists {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn unavailable(locator: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Error::ResourceUnavailable {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }
}
