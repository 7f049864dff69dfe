use reqwest::header;
use std::{borrow::Cow, path::PathBuf, sync::Arc, time::Duration};

pub mod auth;
pub mod config;
pub mod projects;
pub mod scenario;
pub mod tool;
mod util;

pub use config::ProjectConfiguration;
pub use projects::Project;

pub const DEFAULT_API_URI: &str = "https://dev.api.genez.io";

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    Header(#[from] header::InvalidHeaderValue),
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("{0}")]
    Msg(Cow<'static, str>),
    #[error("{request_error} [{extra}]")]
    Service {
        extra: String,
        request_error: reqwest::Error,
    },
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("the configuration yaml file is not valid: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),
    #[error("project directory {} does not exist", .0.display())]
    ProjectDir(PathBuf),
    #[error("could not run `{command}`: {source}")]
    ToolSpawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` failed ({status}): {stderr}")]
    Tool {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("no auth token found, perhaps you need to run `genezio login`?")]
    MissingToken,
    #[error("api error: {0}")]
    Api(String),
    #[error("no project named '{name}' in region '{region}'")]
    ProjectNotFound { name: String, region: String },
    #[error("{} projects named '{name}' in region '{region}': {}", .ids.len(), .ids.join(", "))]
    AmbiguousProject {
        name: String,
        region: String,
        ids: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// An authenticated client for the genezio REST API.
#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    data: Arc<ClientData>,
}

#[derive(Debug, Clone)]
struct ClientData {
    base_url: reqwest::Url,
}

pub struct ClientBuilder {
    base_url: reqwest::Url,
    token: String,
    timeout: Duration,
    headers: header::HeaderMap,
}

impl Client {
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            token: token.into(),
            ..ClientBuilder::new()
        }
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.data.base_url
    }

    fn join_url(&self, path: &str) -> reqwest::Url {
        let mut url = self.url().clone();
        url.set_path(path);
        url
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.join_url(path);
        tracing::debug!(%url, ?query, "GET");
        let resp = self.client.get(url).query(query).send().await?;
        util::handle(resp)
            .await?
            .json()
            .await
            .map_err(Error::Request)
    }
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            base_url: reqwest::Url::parse(DEFAULT_API_URI).expect("default api uri is valid"),
            timeout: Duration::from_secs(60),
            token: String::new(),
            headers: header::HeaderMap::new(),
        }
    }

    /// Sets the base url used for all api requests.
    ///
    /// # Default Value
    /// `https://dev.api.genez.io`
    ///
    /// # Notes
    /// The client will set the path when making requests, as such, any path component will be
    /// overridden. This must also be a valid http URI, like all URLs used with reqwest.
    pub fn service_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = reqwest::Url::parse(url.as_ref())?;
        Ok(self)
    }

    /// Sets the request timeout for requests issued by the client
    ///
    /// # Default Value
    /// 60 Seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the Authorization header token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Sets an arbitrary header to be sent with all requests
    pub fn header<K>(mut self, name: K, value: header::HeaderValue) -> Self
    where
        K: header::IntoHeaderName,
    {
        self.headers.append(name, value);
        self
    }

    pub fn build(mut self) -> Result<Client> {
        if self.token.trim().is_empty() {
            return Err(Error::MissingToken);
        }
        let mut token = header::HeaderValue::try_from(format!("Bearer {}", self.token))?;
        token.set_sensitive(true);
        self.headers.insert(header::AUTHORIZATION, token);
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(self.headers)
            .build()?;
        Ok(Client {
            client,
            data: Arc::new(ClientData {
                base_url: self.base_url,
            }),
        })
    }
}
