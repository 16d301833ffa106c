//! screendoc CLI: turn a screen recording into a redacted step-by-step PDF.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use screendoc::document::FileNarrative;
use screendoc::frames::FrameSelector;
use screendoc::storage::filesystem::ensure_directory;
use screendoc::{
    load_config, Collaborators, DecisionPayload, JobService, JobStatus, PipelineConfig,
    RedactionMode, ReviewMode,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "screendoc")]
#[command(about = "Turn screen recordings into redacted, reviewable step-by-step documents")]
#[command(version)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, short, global = true, default_value = "screendoc.json")]
    config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a recording and generate the final document.
    Run(RunArgs),

    /// Process a recording up to review and print the review payload.
    Review(ReviewArgs),

    /// Extract frames and print the ones that would be embedded.
    Select {
        /// Video file or directory of extracted frames.
        video: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Video file or directory of extracted frames.
    video: PathBuf,

    /// Skip review: no detection, no embedded frames.
    #[arg(long)]
    legacy: bool,

    /// Optional PII categories to enable (url, date, person_name, ...).
    #[arg(long, value_delimiter = ',')]
    optional: Vec<String>,

    /// Reviewer decisions as JSON (a `DecisionPayload`).
    #[arg(long, conflicts_with = "mode")]
    decisions: Option<PathBuf>,

    /// Redaction mode applied when no decision file is given.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Use a pre-written narrative instead of the generated outline.
    #[arg(long)]
    narrative: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ReviewArgs {
    /// Video file or directory of extracted frames.
    video: PathBuf,

    /// Optional PII categories to enable (url, date, person_name, ...).
    #[arg(long, value_delimiter = ',')]
    optional: Vec<String>,

    /// Write the payload here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Blur,
    Black,
    Pixelate,
}

impl From<ModeArg> for RedactionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Blur => RedactionMode::Blur,
            ModeArg::Black => RedactionMode::Black,
            ModeArg::Pixelate => RedactionMode::Pixelate,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.json);

    let result = match &cli.command {
        Commands::Run(args) => run(&cli.config, args),
        Commands::Review(args) => review(&cli.config, args),
        Commands::Select { video } => select(&cli.config, video),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(json: bool) {
    // Library code logs through `log`; forward it into tracing
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
    } else {
        tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };
    if let Err(e) = installed {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
}

fn pipeline_config(config_path: &Path) -> CliResult<Arc<PipelineConfig>> {
    let config = load_config(config_path)?;
    info!(
        "Loaded config {} ({} workers)",
        config_path.display(),
        config.worker_count
    );
    Ok(Arc::new(PipelineConfig::from_config(&config)))
}

fn start_service(config_path: &Path, narrative: Option<&Path>) -> CliResult<JobService> {
    let config = load_config(config_path)?;
    let pipeline_config = Arc::new(PipelineConfig::from_config(&config));

    let mut collaborators = Collaborators::from_config(&pipeline_config)?;
    if let Some(path) = narrative {
        collaborators = collaborators.with_narrative(Arc::new(FileNarrative::new(path)));
    }

    Ok(JobService::new(pipeline_config, collaborators, config.worker_count)?)
}

/// Runs the job to `ready_for_review` (or to completion for legacy jobs).
fn process(service: &JobService, video: &Path, mode: ReviewMode) -> CliResult<String> {
    let job_id = service.create_job(video);
    service.start(&job_id, mode)?;

    let status = service.wait_for(&job_id)?;
    if status.status == JobStatus::Error {
        return Err(format!(
            "Job {} failed: {}",
            job_id,
            status.error.unwrap_or_default()
        )
        .into());
    }
    for warning in &status.warnings {
        warn!("{}", warning);
    }
    Ok(job_id)
}

fn run(config_path: &Path, args: &RunArgs) -> CliResult<()> {
    let service = start_service(config_path, args.narrative.as_deref())?;
    let mode = if args.legacy {
        ReviewMode::Legacy
    } else {
        ReviewMode::Interactive
    };
    let job_id = process(&service, &args.video, mode)?;

    if service.status(&job_id)?.status == JobStatus::ReadyForReview {
        if !args.optional.is_empty() {
            let enabled: BTreeSet<String> = args.optional.iter().cloned().collect();
            let payload = service.redetect(&job_id, &enabled)?;
            info!("{} matches with optional categories {:?}", payload.match_count(), enabled);
        }

        let decisions = match (&args.decisions, args.mode) {
            (Some(path), _) => Some(serde_json::from_slice::<DecisionPayload>(&std::fs::read(path)?)?),
            (None, Some(mode)) => Some(DecisionPayload {
                redaction_mode: mode.into(),
                frames: Vec::new(),
            }),
            (None, None) => None,
        };
        if let Some(decisions) = decisions {
            service.submit_decisions(&job_id, &decisions)?;
        }

        service.generate(&job_id)?;
    }

    let status = service.wait_for(&job_id)?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    service.shutdown();

    match status.status {
        JobStatus::Complete => Ok(()),
        other => Err(format!(
            "Job {} ended as {}: {}",
            job_id,
            other,
            status.error.unwrap_or_default()
        )
        .into()),
    }
}

fn review(config_path: &Path, args: &ReviewArgs) -> CliResult<()> {
    let service = start_service(config_path, None)?;
    let job_id = process(&service, &args.video, ReviewMode::Interactive)?;

    let payload = if args.optional.is_empty() {
        service.review(&job_id)?
    } else {
        let enabled: BTreeSet<String> = args.optional.iter().cloned().collect();
        service.redetect(&job_id, &enabled)?
    };
    let json = serde_json::to_string_pretty(&payload)?;
    service.shutdown();

    match &args.out {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("Wrote review payload for job {} to {}", job_id, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn select(config_path: &Path, video: &Path) -> CliResult<()> {
    let config = pipeline_config(config_path)?;
    let collaborators = Collaborators::from_config(&config)?;

    let scratch = config.work_directory.join("select");
    ensure_directory(&scratch)?;
    let frames = collaborators.frame_source.extract_frames(video, &scratch)?;
    let selected = FrameSelector::select(&frames, config.max_embed_frames);

    info!("Selected {} of {} frames", selected.len(), frames.len());
    for frame in selected {
        println!("{}", frame.display());
    }
    Ok(())
}
