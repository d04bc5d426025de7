use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use scenecast_core::{LanguageModel, PipelineConfig, SpeechProvider, VisualProvider};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod progress;

/// CLI wrapper for LanguageModel (needed for clap ValueEnum)
#[derive(Clone, Copy, ValueEnum)]
enum CliLanguageModel {
    Openai,
    GithubModels,
    Grok,
}

impl From<CliLanguageModel> for LanguageModel {
    fn from(cli: CliLanguageModel) -> Self {
        match cli {
            CliLanguageModel::Openai => LanguageModel::Openai,
            CliLanguageModel::GithubModels => LanguageModel::GithubModels,
            CliLanguageModel::Grok => LanguageModel::Grok,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliSpeech {
    Elevenlabs,
    Openai,
}

impl From<CliSpeech> for SpeechProvider {
    fn from(cli: CliSpeech) -> Self {
        match cli {
            CliSpeech::Elevenlabs => SpeechProvider::ElevenLabs,
            CliSpeech::Openai => SpeechProvider::Openai,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliVisual {
    ModelslabImage,
    ModelslabVideo,
}

impl From<CliVisual> for VisualProvider {
    fn from(cli: CliVisual) -> Self {
        match cli {
            CliVisual::ModelslabImage => VisualProvider::ModelsLabImage,
            CliVisual::ModelslabVideo => VisualProvider::ModelsLabVideo,
        }
    }
}

#[derive(Parser)]
#[command(name = "scenecast")]
#[command(about = "Turn a narrated scene plan into a short video with AI speech, AI visuals and ffmpeg")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory for generated files [env: SCENECAST_WORK_DIR, default: output]
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Language model for topics, scripts and plans
    #[arg(long, global = true)]
    llm: Option<CliLanguageModel>,

    /// Speech provider for narration
    #[arg(long, global = true)]
    speech: Option<CliSpeech>,

    /// Visual provider for scene images or clips
    #[arg(long, global = true)]
    visual: Option<CliVisual>,

    /// Path to the ffmpeg binary
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Render a production plan into final_video.mp4
    Render {
        #[command(flatten)]
        input: TextInput,
    },

    /// Show the scenes a plan splits into, without calling any service
    Scenes {
        #[command(flatten)]
        input: TextInput,

        /// Print scenes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Turn a script into a production plan with the language model
    Plan {
        #[command(flatten)]
        input: TextInput,
    },

    /// Topic, script, plan and render in one go, optionally on a schedule
    Auto {
        /// Use this topic instead of asking for a trending one
        #[arg(long)]
        topic: Option<String>,

        /// Repeat every N minutes until Ctrl-C
        #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u64).range(1..))]
        every: Option<u64>,
    },

    /// List previous runs
    History,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TextInput {
    /// Read text from a file ("-" for stdin)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Text given inline
    #[arg(long)]
    text: Option<String>,
}

impl TextInput {
    async fn read(&self) -> Result<String> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) if path.as_os_str() == "-" => {
                let mut text = String::new();
                tokio::io::stdin().read_to_string(&mut text).await?;
                Ok(text)
            }
            (None, Some(path)) => Ok(tokio::fs::read_to_string(path).await?),
            (None, None) => anyhow::bail!("either --file or --text is required"),
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("scenecast={level},scenecast_core={level}"))
            }),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(2);
        }
    };
    if let Some(work_dir) = cli.work_dir {
        config.work_dir = work_dir;
    }
    if let Some(llm) = cli.llm {
        config.llm = llm.into();
    }
    if let Some(speech) = cli.speech {
        config.speech = speech.into();
    }
    if let Some(visual) = cli.visual {
        config.visual = visual.into();
    }
    if let Some(ffmpeg) = cli.ffmpeg {
        config.ffmpeg = ffmpeg;
    }

    match cli.command {
        Command::Render { input } => {
            let plan = input.read().await?;
            commands::render(&config, &plan).await
        }
        Command::Scenes { input, json } => {
            let plan = input.read().await?;
            commands::scenes(&plan, json)
        }
        Command::Plan { input } => {
            let script = input.read().await?;
            commands::plan(&config, &script).await
        }
        Command::Auto { topic, every } => commands::auto(&config, topic, every).await,
        Command::History => commands::history(&config).await,
    }
}
