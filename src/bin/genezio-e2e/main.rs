use argh::FromArgs;
use color_eyre::eyre::{self, WrapErr};
use genezio_e2e::{
    auth::TokenSource,
    scenario::{self, GenezioPlatform, Scenario},
    tool::{self, DeploymentTool},
    Client,
};
use std::path::PathBuf;
use tokio::io::{self, AsyncWriteExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Copy, Debug)]
enum Format {
    Json,
    Yaml,
}

impl std::str::FromStr for Format {
    type Err = eyre::Report;
    fn from_str(s: &str) -> eyre::Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            _ => eyre::bail!("unsupported output format: {}", s),
        }
    }
}

impl Format {
    fn to_vec<T: serde::Serialize + ?Sized>(self, item: &T) -> eyre::Result<Vec<u8>> {
        let mut v = match self {
            Format::Json => {
                serde_json::to_vec_pretty(item).wrap_err("could not JSON serialize item")?
            }
            Format::Yaml => serde_yaml::to_string(item)
                .wrap_err("could not YAML serialize item")?
                .into_bytes(),
        };
        v.push(b'\n');
        Ok(v)
    }
}

#[derive(Debug, FromArgs)]
/// End-to-end check of the genezio CLI: deploy a sample project,
/// find it through the REST API, then delete it.
struct Opts {
    /// log debug output, including the output of every genezio command
    #[argh(switch, short = 'v')]
    verbose: bool,
    #[argh(subcommand)]
    cmd: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(Run),
    Projects(Projects),
}

#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
/// Deploy, resolve and delete the sample project
struct Run {
    /// directory holding the sample project's genezio.yaml
    #[argh(option, default = "PathBuf::from(scenario::DEFAULT_PROJECT_DIR)")]
    project_dir: PathBuf,
    /// base url of the genezio api
    #[argh(option, default = "genezio_e2e::DEFAULT_API_URI.to_string()")]
    api_url: String,
    /// genezio executable to invoke
    #[argh(option, default = "tool::DEFAULT_PROGRAM.to_string()")]
    genezio: String,
    /// extra KEY=VALUE environment for every genezio command, may be repeated
    #[argh(option)]
    env: Vec<String>,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "projects")]
/// List the projects of the logged in account
struct Projects {
    /// format to print the output, can be either 'json' or 'yaml' (the default).
    #[argh(option, short = 'o', default = "Format::Yaml")]
    format: Format,
    /// index of the first project to list
    #[argh(option, default = "scenario::DEFAULT_START_INDEX")]
    start: u32,
    /// maximum number of projects to list
    #[argh(option, default = "scenario::DEFAULT_PROJECTS_LIMIT")]
    limit: u32,
    /// base url of the genezio api
    #[argh(option, default = "genezio_e2e::DEFAULT_API_URI.to_string()")]
    api_url: String,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "genezio_e2e=debug,warn"
    } else {
        "genezio_e2e=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args: Opts = argh::from_env();
    init_logging(args.verbose);

    match args.cmd {
        Command::Run(Run {
            project_dir,
            api_url,
            genezio,
            env,
        }) => {
            let mut tool = DeploymentTool::new(genezio).current_dir(&project_dir);
            for pair in &env {
                let (key, val) = pair
                    .split_once('=')
                    .ok_or_else(|| eyre::eyre!("expected KEY=VALUE, got '{}'", pair))?;
                tool = tool.env(key, val);
            }
            let api_url = api_url
                .parse::<reqwest::Url>()
                .wrap_err_with(|| format!("invalid api url {}", api_url))?;
            let scenario = Scenario::new(&project_dir);
            let mut platform = GenezioPlatform::new(tool, TokenSource::default(), api_url);
            let outcome = scenario
                .run(&mut platform)
                .await
                .wrap_err_with(|| format!("scenario failed in {}", project_dir.display()))?;
            tracing::info!(
                id = %outcome.project.id,
                "deployed and deleted {}",
                outcome.config.name
            );
            io::stdout()
                .write_all(b"Success!\n")
                .await
                .wrap_err("could not print output")
        }
        Command::Projects(Projects {
            format,
            start,
            limit,
            api_url,
        }) => {
            let token = TokenSource::default().token().await?;
            let client = Client::builder(token).service_url(api_url)?.build()?;
            let projects = format.to_vec(&client.list_projects(start, limit).await?)?;
            io::stdout()
                .write_all(&projects)
                .await
                .wrap_err("could not print output")
        }
    }
}
