//! Command-line front end for the rozmova pipeline: transcribe one or
//! more call recordings sequentially and print the results.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use rozmova_core::{
    AudioSource, Job, JobStatus, LogLevel, MemoryStore, Pipeline, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "rozmova", version, about = "Transcribe and analyze Ukrainian call recordings")]
struct Args {
    /// Audio files to process, in order
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Language code passed to the transcription service
    #[arg(short, long, value_name = "LANG")]
    language: Option<String>,

    /// Run the structured analysis pass after transcription
    #[arg(short, long)]
    analyze: bool,

    /// Self-hosted transcription endpoint instead of the hosted API
    #[arg(long, value_name = "URL")]
    server_url: Option<String>,

    /// Run analysis against a self-hosted generation endpoint
    #[arg(long, value_name = "URL")]
    local_model_url: Option<String>,

    /// Hosted analysis model override
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Print the full audit trail for every job
    #[arg(short, long)]
    verbose: bool,
}

/// MIME type for an audio file, by extension. The pipeline rejects
/// anything that is not `audio/...`, so unknown extensions fail fast.
fn mime_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" | "mp4" => "audio/mp4",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        "" => "application/octet-stream",
        other => return format!("application/{other}"),
    }
    .to_string()
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load(),
    };

    if let Some(url) = &args.server_url {
        settings.server_url = Some(url.clone());
    }
    if let Some(language) = &args.language {
        settings.language = Some(language.clone());
    }
    if args.analyze {
        settings.analysis.enabled = true;
    }
    if let Some(url) = &args.local_model_url {
        settings.analysis.use_local = true;
        settings.analysis.local_url = Some(url.clone());
    }
    if let Some(model) = &args.model {
        settings.analysis.model = Some(model.clone());
    }
    Ok(settings)
}

fn print_job(job: &Job, store: &MemoryStore, verbose: bool) {
    match job.status {
        JobStatus::Completed => {
            println!("== {} ==", job.name);
            if let Some(seconds) = job.processing_time_seconds {
                println!("processed in {seconds:.1}s");
            }
            if let Some(transcript) = &job.transcript {
                println!("\n{transcript}");
            }
            if let Some(analysis) = &job.analysis {
                println!("\n--- Аналіз ---");
                if !analysis.problems.is_empty() {
                    println!("Проблеми:");
                    for problem in &analysis.problems {
                        println!("  - {problem}");
                    }
                }
                if !analysis.solutions.is_empty() {
                    println!("Рішення:");
                    for solution in &analysis.solutions {
                        println!("  - {solution}");
                    }
                }
                println!("Температура розмови: {}/10", analysis.temperature);
                if !analysis.summary.is_empty() {
                    println!("\n{}", analysis.summary);
                }
            }
        }
        _ => {
            eprintln!(
                "== {} == failed: {}",
                job.name,
                job.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if verbose {
        println!("\n--- Журнал ---");
        for entry in store.logs() {
            if entry.job_id == job.id {
                println!(
                    "[{}] {} {}",
                    entry.created_at.format("%H:%M:%S"),
                    entry.level,
                    entry.message
                );
            }
        }
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("rozmova=debug,rozmova_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = load_settings(&args)?;
    let config = settings.pipeline_config()?;
    let language = config.language.clone();
    let pipeline = Pipeline::new(config, MemoryStore::new())?;

    let mut seen_names: HashSet<String> = HashSet::new();
    let mut failures = 0usize;

    for path in &args.files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .unwrap_or_else(|| path.display().to_string());

        // same duplicate guard the upload form applied
        if !seen_names.insert(name.clone()) {
            eprintln!("skipping {name}: a file with this name was already processed");
            continue;
        }

        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;

        let mut job = Job::new(&name, data.len() as u64, &language);
        let audio = AudioSource {
            data,
            filename: name.clone(),
            mime_type: mime_for(path),
        };

        if let Err(err) = pipeline.process_job(&mut job, audio).await {
            tracing::error!(file = %name, error = %err, "processing failed");
            failures += 1;
        }
        print_job(&job, pipeline.store(), args.verbose);
    }

    let warnings = pipeline.store().logs_at(LogLevel::Warning).len();
    if warnings > 0 {
        eprintln!("{warnings} warning(s) recorded; rerun with --verbose for details");
    }

    if failures > 0 {
        bail!("{failures} of {} file(s) failed", args.files.len());
    }
    Ok(())
}
