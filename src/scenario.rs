//! The deploy, resolve, delete scenario.
//!
//! Every step has side effects on the remote account, so the order is fixed and
//! the first failure aborts the run. Nothing is rolled back: a project deployed
//! before a later failure stays deployed.

use crate::{
    auth::TokenSource, projects, tool::DeploymentTool, Client, Error, Project,
    ProjectConfiguration,
};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_PROJECT_DIR: &str = "../../examples/typescript/hello-world/server/";
pub const DEFAULT_START_INDEX: u32 = 0;
pub const DEFAULT_PROJECTS_LIMIT: u32 = 100;

/// The external effects the scenario performs, in the order it performs them.
#[allow(async_fn_in_trait)]
pub trait Platform {
    async fn check_account(&mut self) -> crate::Result<()>;
    async fn deploy(&mut self, config: &ProjectConfiguration) -> crate::Result<()>;
    async fn auth_token(&mut self) -> crate::Result<String>;
    async fn list_projects(
        &mut self,
        token: &str,
        start_index: u32,
        limit: u32,
    ) -> crate::Result<Vec<Project>>;
    async fn delete(
        &mut self,
        config: &ProjectConfiguration,
        project_id: &str,
    ) -> crate::Result<()>;
}

/// The real thing: the `genezio` CLI plus the REST API.
#[derive(Debug, Clone)]
pub struct GenezioPlatform {
    tool: DeploymentTool,
    tokens: TokenSource,
    api_url: reqwest::Url,
    timeout: Duration,
}

impl GenezioPlatform {
    pub fn new(tool: DeploymentTool, tokens: TokenSource, api_url: reqwest::Url) -> Self {
        Self {
            tool,
            tokens,
            api_url,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Platform for GenezioPlatform {
    async fn check_account(&mut self) -> crate::Result<()> {
        self.tool.account().await.map(drop)
    }

    async fn deploy(&mut self, config: &ProjectConfiguration) -> crate::Result<()> {
        self.tool.deploy(config).await.map(drop)
    }

    async fn auth_token(&mut self) -> crate::Result<String> {
        self.tokens.token().await
    }

    async fn list_projects(
        &mut self,
        token: &str,
        start_index: u32,
        limit: u32,
    ) -> crate::Result<Vec<Project>> {
        Client::builder(token)
            .service_url(self.api_url.as_str())?
            .timeout(self.timeout)
            .build()?
            .list_projects(start_index, limit)
            .await
    }

    async fn delete(
        &mut self,
        config: &ProjectConfiguration,
        project_id: &str,
    ) -> crate::Result<()> {
        self.tool.delete(config, project_id).await.map(drop)
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    project_dir: PathBuf,
    start_index: u32,
    limit: u32,
}

/// What a completed run deployed and then deleted.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub config: ProjectConfiguration,
    pub project: Project,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECT_DIR)
    }
}

impl Scenario {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            start_index: DEFAULT_START_INDEX,
            limit: DEFAULT_PROJECTS_LIMIT,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Sets the listing window searched for the deployed project.
    pub fn window(mut self, start_index: u32, limit: u32) -> Self {
        self.start_index = start_index;
        self.limit = limit;
        self
    }

    /// Checks the project directory exists and loads its configuration.
    pub async fn prepare(&self) -> crate::Result<ProjectConfiguration> {
        let is_dir = tokio::fs::metadata(&self.project_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(Error::ProjectDir(self.project_dir.clone()));
        }
        let config = ProjectConfiguration::load(&self.project_dir).await?;
        tracing::info!(
            project = %config.name,
            region = %config.region,
            classes = config.classes.len(),
            "read genezio.yaml"
        );
        Ok(config)
    }

    pub async fn run<P: Platform>(&self, platform: &mut P) -> crate::Result<Outcome> {
        let config = self.prepare().await?;

        platform.check_account().await?;
        tracing::info!("account check passed");

        platform.deploy(&config).await?;
        tracing::info!("deploy finished");

        let token = platform.auth_token().await?;
        let listing = platform
            .list_projects(&token, self.start_index, self.limit)
            .await?;
        tracing::info!(count = listing.len(), "listed projects");

        let project = projects::find_project(&listing, &config.name, &config.region)?.clone();
        tracing::info!(id = %project.id, "resolved deployed project");

        platform.delete(&config, &project.id).await?;
        tracing::info!(id = %project.id, "deleted project");

        Ok(Outcome { config, project })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Account,
        Deploy(String),
        Token,
        List { token: String, start: u32, limit: u32 },
        Delete(String),
    }

    struct Recorder {
        calls: Vec<Call>,
        listing: Option<Vec<Project>>,
        fail_deploy: bool,
    }

    impl Recorder {
        fn with_listing(listing: Vec<Project>) -> Self {
            Self {
                calls: Vec::new(),
                listing: Some(listing),
                fail_deploy: false,
            }
        }

        fn deleted(&self) -> bool {
            self.calls.iter().any(|c| matches!(c, Call::Delete(_)))
        }
    }

    impl Platform for Recorder {
        async fn check_account(&mut self) -> crate::Result<()> {
            self.calls.push(Call::Account);
            Ok(())
        }

        async fn deploy(&mut self, config: &ProjectConfiguration) -> crate::Result<()> {
            self.calls.push(Call::Deploy(config.name.clone()));
            if self.fail_deploy {
                Err(Error::Msg("deploy failed".into()))
            } else {
                Ok(())
            }
        }

        async fn auth_token(&mut self) -> crate::Result<String> {
            self.calls.push(Call::Token);
            Ok("tok".into())
        }

        async fn list_projects(
            &mut self,
            token: &str,
            start: u32,
            limit: u32,
        ) -> crate::Result<Vec<Project>> {
            self.calls.push(Call::List {
                token: token.into(),
                start,
                limit,
            });
            self.listing
                .clone()
                .ok_or_else(|| Error::Api("listing unavailable".into()))
        }

        async fn delete(
            &mut self,
            _config: &ProjectConfiguration,
            project_id: &str,
        ) -> crate::Result<()> {
            self.calls.push(Call::Delete(project_id.into()));
            Ok(())
        }
    }

    fn project(id: &str, name: &str, region: &str) -> Project {
        Project {
            id: id.into(),
            name: name.into(),
            region: region.into(),
            cloud_provider: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn hello_world_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "name: hello-world-ts\nregion: us-east-1\n",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn deletes_resolved_project_in_order() {
        let dir = hello_world_dir();
        let mut platform = Recorder::with_listing(vec![
            project("zzz", "hello-world-ts", "eu-central-1"),
            project("abc123", "hello-world-ts", "us-east-1"),
        ]);

        let outcome = Scenario::new(dir.path()).run(&mut platform).await.unwrap();

        assert_eq!(outcome.project.id, "abc123");
        assert_eq!(
            platform.calls,
            vec![
                Call::Account,
                Call::Deploy("hello-world-ts".into()),
                Call::Token,
                Call::List {
                    token: "tok".into(),
                    start: 0,
                    limit: 100
                },
                Call::Delete("abc123".into()),
            ]
        );
    }

    #[tokio::test]
    async fn unmatched_project_skips_delete() {
        let dir = hello_world_dir();
        let mut platform = Recorder::with_listing(vec![project("x", "todo-list", "us-east-1")]);

        let err = Scenario::new(dir.path()).run(&mut platform).await.unwrap_err();

        assert!(matches!(err, Error::ProjectNotFound { .. }));
        assert!(!platform.deleted());
    }

    #[tokio::test]
    async fn ambiguous_project_skips_delete() {
        let dir = hello_world_dir();
        let mut platform = Recorder::with_listing(vec![
            project("a", "hello-world-ts", "us-east-1"),
            project("b", "hello-world-ts", "us-east-1"),
        ]);

        let err = Scenario::new(dir.path()).run(&mut platform).await.unwrap_err();

        assert!(matches!(err, Error::AmbiguousProject { .. }));
        assert!(!platform.deleted());
    }

    #[tokio::test]
    async fn failed_listing_skips_delete() {
        let dir = hello_world_dir();
        let mut platform = Recorder {
            calls: Vec::new(),
            listing: None,
            fail_deploy: false,
        };

        assert!(Scenario::new(dir.path()).run(&mut platform).await.is_err());
        assert!(!platform.deleted());
    }

    #[tokio::test]
    async fn failed_deploy_stops_run() {
        let dir = hello_world_dir();
        let mut platform = Recorder::with_listing(Vec::new());
        platform.fail_deploy = true;

        assert!(Scenario::new(dir.path()).run(&mut platform).await.is_err());
        assert_eq!(platform.calls.last(), Some(&Call::Deploy("hello-world-ts".into())));
    }

    #[tokio::test]
    async fn missing_project_dir_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut platform = Recorder::with_listing(Vec::new());

        let err = Scenario::new(dir.path().join("nope"))
            .run(&mut platform)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProjectDir(_)));
        assert!(platform.calls.is_empty());
    }

    #[tokio::test]
    async fn missing_config_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut platform = Recorder::with_listing(Vec::new());

        let err = Scenario::new(dir.path()).run(&mut platform).await.unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert!(platform.calls.is_empty());
    }

    #[tokio::test]
    async fn custom_window() {
        let dir = hello_world_dir();
        let mut platform =
            Recorder::with_listing(vec![project("abc123", "hello-world-ts", "us-east-1")]);

        Scenario::new(dir.path())
            .window(100, 50)
            .run(&mut platform)
            .await
            .unwrap();

        assert!(platform.calls.contains(&Call::List {
            token: "tok".into(),
            start: 100,
            limit: 50
        }));
    }
}
