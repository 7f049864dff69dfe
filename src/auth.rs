//! Bearer token lookup for the genezio API.

use crate::Error;
use directories::BaseDirs;
use std::path::PathBuf;

pub const TOKEN_ENV_VAR: &str = "GENEZIO_TOKEN";
pub const TOKEN_FILE_NAME: &str = ".geneziorc";

/// Where to look for the auth token written by `genezio login`.
#[derive(Debug, Clone)]
pub enum TokenSource {
    Env(String),
    File(PathBuf),
    /// Tries each source in order, the first non-empty token wins.
    Chain(Vec<TokenSource>),
}

impl Default for TokenSource {
    /// `$GENEZIO_TOKEN`, then `~/.geneziorc`.
    fn default() -> Self {
        let mut sources = vec![TokenSource::Env(TOKEN_ENV_VAR.into())];
        if let Some(dirs) = BaseDirs::new() {
            sources.push(TokenSource::File(dirs.home_dir().join(TOKEN_FILE_NAME)));
        }
        TokenSource::Chain(sources)
    }
}

impl TokenSource {
    pub async fn token(&self) -> crate::Result<String> {
        for source in self.leaves() {
            if let Some(token) = source.read().await? {
                tracing::debug!(?source, "found auth token");
                return Ok(token);
            }
        }
        Err(Error::MissingToken)
    }

    fn leaves(&self) -> Vec<&TokenSource> {
        match self {
            TokenSource::Chain(sources) => sources.iter().flat_map(TokenSource::leaves).collect(),
            leaf => vec![leaf],
        }
    }

    async fn read(&self) -> crate::Result<Option<String>> {
        let raw = match self {
            TokenSource::Env(var) => std::env::var(var).ok(),
            TokenSource::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(s) => Some(s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(source) => {
                    return Err(Error::Io {
                        path: path.clone(),
                        source,
                    })
                }
            },
            TokenSource::Chain(_) => None,
        };
        Ok(raw
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty()))
    }
}
