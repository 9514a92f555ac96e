//! Error type shared by every structure reader.

use super::Format;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading structure files.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying stream or file failed.
    #[error(
        "I/O error for {path_desc}: {source}",
        path_desc = PathDisplay(path)
    )]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// The content does not follow the format; `line_number` is 1-based.
    #[error(
        "failed to parse {format} {path_desc}: {details} (line {line_number})",
        path_desc = PathDisplay(path)
    )]
    Parse {
        format: Format,
        path: Option<PathBuf>,
        line_number: usize,
        details: String,
    },

    /// No parser is registered for the requested extension or format name.
    #[error("unsupported structure format '{name}'")]
    UnsupportedFormat { name: String },

    /// The record parsed but failed molecule validation.
    #[error(transparent)]
    Model(#[from] crate::model::error::Error),
}

impl Error {
    pub fn from_io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { path, source }
    }

    /// Builds a parse error for an anonymous stream; [`read_file`](super::read_file) attaches
    /// the path afterwards.
    pub fn parse(format: Format, line_number: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            path: None,
            line_number,
            details: details.into(),
        }
    }

    pub fn unsupported_format(name: impl Into<String>) -> Self {
        Self::UnsupportedFormat { name: name.into() }
    }

    /// Attaches a source path to errors raised while reading an anonymous stream.
    pub(crate) fn at_path(self, source_path: &Path) -> Self {
        match self {
            Self::Io { path: None, source } => Self::Io {
                path: Some(source_path.to_path_buf()),
                source,
            },
            Self::Parse {
                format,
                path: None,
                line_number,
                details,
            } => Self::Parse {
                format,
                path: Some(source_path.to_path_buf()),
                line_number,
                details,
            },
            other => other,
        }
    }
}

struct PathDisplay<'a>(&'a Option<PathBuf>);

impl<'a> fmt::Display for PathDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(p) => write!(f, "file '{}'", p.display()),
            None => write!(f, "stream source"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::error::EntityKind;

    #[test]
    fn parse_error_reports_format_and_line() {
        let err = Error::parse(Format::Pdb, 12, "invalid X coordinate");
        assert_eq!(
            err.to_string(),
            "failed to parse PDB stream source: invalid X coordinate (line 12)"
        );
    }

    #[test]
    fn at_path_fills_missing_path_only() {
        let err = Error::parse(Format::Sdf, 4, "bad counts line").at_path(Path::new("lig.sdf"));
        assert_eq!(
            err.to_string(),
            "failed to parse SDF file 'lig.sdf': bad counts line (line 4)"
        );

        let unsupported = Error::unsupported_format("pqr").at_path(Path::new("x.pqr"));
        assert!(matches!(unsupported, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn model_errors_convert_transparently() {
        let model = crate::model::error::Error::not_found(EntityKind::Chain, "C");
        let err: Error = model.clone().into();

        assert_eq!(err.to_string(), model.to_string());
    }
}
