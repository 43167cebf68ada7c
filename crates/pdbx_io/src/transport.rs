//! Retrieving structure files over HTTP.

use pdbx_core::Result;

/// Something that can GET a URL and hand back the body.
///
/// Implementations report a non-success response as
/// [`ErrorKind::NotFound`](pdbx_core::ErrorKind::NotFound) and connection
/// failures as [`ErrorKind::Io`](pdbx_core::ErrorKind::Io).
pub trait Transport {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        (**self).get(url)
    }
}

/// Turns a PDB code, a code with an extension, or a URL into the URL to
/// download. Codes are lowercased.
pub fn resolve_url(identifier: &str) -> String {
    if identifier.starts_with("http") {
        return identifier.to_string();
    }
    let code = identifier.to_ascii_lowercase();
    if let Some(stem) = code.strip_suffix(".bcif") {
        return format!("https://models.rcsb.org/{stem}.bcif");
    }
    if let Some(stem) = code.strip_suffix(".mmtf") {
        return format!("https://mmtf.rcsb.org/v1.0/full/{stem}");
    }
    if code.ends_with(".pdb") || code.ends_with(".cif") {
        return format!("https://files.rcsb.org/view/{code}");
    }
    format!("https://files.rcsb.org/view/{code}.cif")
}

#[cfg(feature = "http")]
pub use self::http::UreqTransport;

#[cfg(feature = "http")]
mod http {
    use std::io::Read;
    use std::time::Duration;

    use pdbx_core::{Error, ErrorKind, Result};

    use super::Transport;

    /// A blocking transport backed by a shared `ureq` agent.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new(timeout: Duration) -> Self {
            Self {
                agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new(Duration::from_secs(60))
        }
    }

    impl Transport for UreqTransport {
        fn get(&self, url: &str) -> Result<Vec<u8>> {
            let response = match self.agent.get(url).call() {
                Ok(response) => response,
                Err(ureq::Error::Status(status, _)) => {
                    return Err(Error::not_found(format!("{url} answered {status}")));
                }
                Err(err) => return Err(Error::new(ErrorKind::Io, err.to_string())),
            };
            let mut body = Vec::new();
            response.into_reader().read_to_end(&mut body)?;
            tracing::debug!(url, bytes = body.len(), "downloaded");
            Ok(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn codes_resolve_to_rcsb() {
        assert_eq!(resolve_url("1LOL"), "https://files.rcsb.org/view/1lol.cif");
        assert_eq!(resolve_url("1lol.cif"), "https://files.rcsb.org/view/1lol.cif");
        assert_eq!(resolve_url("1LOL.pdb"), "https://files.rcsb.org/view/1lol.pdb");
        assert_eq!(resolve_url("1lol.bcif"), "https://models.rcsb.org/1lol.bcif");
        assert_eq!(resolve_url("1lol.mmtf"), "https://mmtf.rcsb.org/v1.0/full/1lol");
    }

    #[test]
    fn urls_pass_through() {
        let url = "https://example.org/Files/1LOL.cif";
        assert_eq!(resolve_url(url), url);
    }
}
