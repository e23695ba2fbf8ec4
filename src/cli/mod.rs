pub mod jobs;
pub mod voices;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::client::HttpGenerationClient;
use crate::errors::ClientError;
use crate::models::config::load_config;
use crate::models::{ClientConfig, GenerationMode};

/// Virtual Presenter Client - submit story generation jobs and track them to completion
#[derive(Parser, Debug)]
#[command(
    name = "vpc",
    version,
    about = "Virtual Presenter Client - submit story generation jobs and track them to completion"
)]
pub struct Cli {
    /// Backend base URL (overrides config)
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Path to configuration file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a story and follow the resulting job
    Submit {
        /// Script text to narrate
        #[arg(short = 's', long, conflicts_with = "script_file")]
        script: Option<String>,

        /// Read the script from a file
        #[arg(long = "script-file", conflicts_with = "script")]
        script_file: Option<PathBuf>,

        /// Cloned voice to narrate with
        #[arg(long = "voice-id")]
        voice_id: String,

        /// Generation mode (creative or broadcast)
        #[arg(short = 'm', long, default_value = "creative")]
        mode: GenerationMode,

        /// Optional title
        #[arg(short = 't', long)]
        title: Option<String>,

        /// Optional avatar image URL
        #[arg(long = "avatar-image-url")]
        avatar_image_url: Option<String>,

        /// Print the job id and exit without tracking
        #[arg(long = "no-follow")]
        no_follow: bool,

        /// Output events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Track one or more existing jobs until they finish
    Watch {
        /// Job ids to track
        #[arg(required = true)]
        job_ids: Vec<String>,

        /// Output events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch the current status of a job once
    Status {
        /// Job id
        job_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a voice sample to be cloned
    CloneVoice {
        /// Audio file to upload
        file: PathBuf,

        /// Label for the cloned voice
        #[arg(short = 'l', long)]
        label: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Resolve the effective config: file (or defaults) with CLI overrides applied.
pub fn resolve_config(config_path: Option<&Path>, base_url: Option<&str>) -> anyhow::Result<ClientConfig> {
    let mut config = load_config(config_path)?;
    if let Some(url) = base_url {
        config.base_url = url.to_string();
    }
    Ok(config)
}

/// Build the HTTP client for the configured backend.
pub fn build_client(config: &ClientConfig) -> anyhow::Result<Arc<HttpGenerationClient>> {
    let client = HttpGenerationClient::new(&config.base_url, config.request_timeout())
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(Arc::new(client))
}

/// Format a connection error message for when the backend is not reachable.
pub fn connection_error_message(base_url: &str) -> String {
    format!(
        "Could not connect to the generation backend at {}. Is it running? (try: --base-url)",
        base_url
    )
}

/// Turn a client error into a user-facing error.
pub fn describe_error(err: &ClientError, base_url: &str) -> anyhow::Error {
    if err.is_transient() {
        anyhow::anyhow!("{}", connection_error_message(base_url))
    } else {
        anyhow::anyhow!("{}", err)
    }
}

/// Dispatch the CLI command to the appropriate handler.
pub async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    let Some(command) = &cli.command else {
        // No subcommand provided -- print help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = resolve_config(cli.config.as_deref(), cli.base_url.as_deref())?;

    match command {
        Commands::Submit {
            script,
            script_file,
            voice_id,
            mode,
            title,
            avatar_image_url,
            no_follow,
            json,
        } => {
            let script = match (script, script_file) {
                (Some(text), None) => text.clone(),
                (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("Failed to read script file '{}': {}", path.display(), e)
                })?,
                _ => anyhow::bail!("Either --script (-s) or --script-file must be specified"),
            };
            let mut submission = crate::models::StorySubmission::new(*mode, script, voice_id);
            submission.title = title.clone();
            submission.avatar_image_url = avatar_image_url.clone();
            jobs::cmd_submit(&config, submission, *no_follow, *json).await
        }
        Commands::Watch { job_ids, json } => jobs::cmd_watch(&config, job_ids, *json).await,
        Commands::Status { job_id, json } => jobs::cmd_status(&config, job_id, *json).await,
        Commands::CloneVoice { file, label, json } => {
            voices::cmd_clone_voice(&config, file, label.as_deref(), *json).await
        }
    }
}
