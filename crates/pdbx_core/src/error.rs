use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::{io, result};

use thiserror::Error;

pub type Result<T, E = Error> = result::Result<T, E>;

/// Broad classification of everything that can go wrong while reading or
/// writing a structure file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A remote resource did not answer with success.
    #[error("resource not found")]
    NotFound,
    /// A structural rule of the input format was violated.
    #[error("malformed input")]
    Malformed,
    /// An encoding id or kind that no codec here understands.
    #[error("unsupported encoding")]
    UnsupportedEncoding,
    #[error("I/O error")]
    Io,
    #[error("input was not valid UTF-8")]
    Utf8,
}

/// An error with the place in the file it was found.
///
/// Decoders report the innermost problem and callers add scopes on the way
/// out, so a bad BinaryCIF column reads `atom_site > Cartn_x > ...`.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    scopes: Vec<String>,
    path: Option<PathBuf>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            scopes: Vec::new(),
            path: None,
            source: None,
        }
    }

    pub fn malformed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Malformed, message)
    }

    pub fn unsupported(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::UnsupportedEncoding, message)
    }

    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Enclosing scopes, outermost first.
    pub fn scopes(&self) -> impl Iterator<Item = &str> + '_ {
        self.scopes.iter().rev().map(String::as_str)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records that the error happened inside `scope` (a category, column,
    /// field or record name).
    pub fn within(mut self, scope: impl fmt::Display) -> Self {
        self.scopes.push(scope.to_string());
        self
    }

    /// The file the error came from. An existing path is kept.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        if self.path.is_none() {
            self.path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.kind)?;
        for scope in self.scopes() {
            write!(f, "{scope} > ")?;
        }
        f.write_str(&self.message)?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string()).with_source(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::new(ErrorKind::Utf8, err.to_string()).with_source(err.utf8_error())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        let message = format!("invalid UTF-8 after byte {}", err.valid_up_to());
        Error::new(ErrorKind::Utf8, message).with_source(err)
    }
}

/// A MessagePack marker that could not be read means the buffer ended early.
impl From<rmp::decode::MarkerReadError<io::Error>> for Error {
    fn from(err: rmp::decode::MarkerReadError<io::Error>) -> Self {
        Error::malformed("truncated MessagePack data").with_source(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_lists_scopes_then_path() {
        let err = Error::malformed("8 values for 9 rows")
            .within("Cartn_x")
            .within("atom_site")
            .with_path("1lol.bcif");
        assert_eq!(
            err.to_string(),
            "malformed input: atom_site > Cartn_x > 8 values for 9 rows (1lol.bcif)"
        );
        assert_eq!(err.scopes().collect::<Vec<_>>(), vec!["atom_site", "Cartn_x"]);
    }

    #[test]
    fn innermost_path_wins() {
        let err = Error::not_found("gone").with_path("inner.cif").with_path("outer.cif");
        assert_eq!(err.path(), Some(Path::new("inner.cif")));
    }

    #[test]
    fn utf8_errors_report_the_offset() {
        let err = Error::from(std::str::from_utf8(&[b'A', 0xff]).unwrap_err());
        assert_eq!(err.kind(), ErrorKind::Utf8);
        assert_eq!(err.message(), "invalid UTF-8 after byte 1");
        assert!(StdError::source(&err).is_some());
    }
}
