/*
[INPUT]:  CLI arguments, optional YAML configuration file, OS shutdown signals
[OUTPUT]: Remote task commands, optionally followed until their poll settles
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vidsub_adapter::{TaskId, TaskServiceClient, UploadFile};
use vidsub_sync::{
    ChannelObserver, FanoutObserver, ReconcileEvent, StopReason, SyncConfig, TaskReconciler,
    TracingObserver,
};

#[derive(Parser, Debug)]
#[command(name = "vidsub-sync", version, about = "Video subtitle task sync client")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// Overrides `base_url` from the config file
    #[arg(long = "base-url", value_name = "URL")]
    base_url: Option<String>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a video file and create a task
    Upload {
        file: PathBuf,
        /// Start processing right after the upload
        #[arg(long)]
        process: bool,
        /// Follow the task until it completes or fails
        #[arg(long, requires = "process")]
        wait: bool,
    },
    /// Start processing an uploaded task
    Process {
        task_id: String,
        #[arg(long)]
        wait: bool,
    },
    /// Fetch one task
    Show { task_id: String },
    /// List every task
    List,
    /// Submit subtitle content from a JSON file
    Edit { task_id: String, content: PathBuf },
    /// Service health report
    Status,
    /// Run the audio extraction probe for a task
    ExtractAudio { task_id: String },
    /// Run the transcription probe for a task
    Transcribe { task_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let mut config = load_config(args.config_path.as_deref())?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    info!(base_url = %config.base_url, "starting vidsub-sync");

    let client = TaskServiceClient::with_config_and_base_url(
        config.http.client_config(),
        &config.base_url,
    )
    .context("build task service client")?;

    let (channel, events) = ChannelObserver::new();
    let observer = FanoutObserver::new()
        .with(Arc::new(TracingObserver))
        .with(Arc::new(channel));
    let reconciler =
        TaskReconciler::with_observer(Arc::new(client), config.reconciler.clone(), Arc::new(observer));

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    let outcome = run(&reconciler, args.command, events, shutdown).await;
    reconciler.shutdown();
    outcome
}

async fn run(
    reconciler: &TaskReconciler,
    command: Command,
    events: mpsc::UnboundedReceiver<ReconcileEvent>,
    shutdown: CancellationToken,
) -> Result<()> {
    match command {
        Command::Upload {
            file,
            process,
            wait,
        } => {
            let upload = UploadFile::from_path(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let task = reconciler.create(upload).await.context("upload video")?;
            print_json(&task)?;
            if process {
                reconciler
                    .start_processing(&task.id)
                    .await
                    .context("start processing")?;
                if wait {
                    follow(reconciler, &task.id, events, shutdown).await?;
                }
            }
        }
        Command::Process { task_id, wait } => {
            let task_id = TaskId::new(task_id);
            reconciler
                .start_processing(&task_id)
                .await
                .context("start processing")?;
            if wait {
                follow(reconciler, &task_id, events, shutdown).await?;
            }
        }
        Command::Show { task_id } => {
            let task = reconciler
                .fetch(&TaskId::new(task_id))
                .await
                .context("fetch task")?;
            print_json(&task)?;
        }
        Command::List => {
            let tasks = reconciler.list_all().await.context("list tasks")?;
            print_json(&tasks)?;
        }
        Command::Edit { task_id, content } => {
            let raw = tokio::fs::read_to_string(&content)
                .await
                .with_context(|| format!("read {}", content.display()))?;
            let content: serde_json::Value =
                serde_json::from_str(&raw).context("subtitle content must be JSON")?;
            let task = reconciler
                .submit_edit(&TaskId::new(task_id), &content)
                .await
                .context("submit subtitle edit")?;
            print_json(&task)?;
        }
        Command::Status => {
            let status = reconciler.service_status().await.context("service status")?;
            print_json(&status)?;
        }
        Command::ExtractAudio { task_id } => {
            let report = reconciler
                .extract_audio(&TaskId::new(task_id))
                .await
                .context("extract audio")?;
            print_json(&report)?;
        }
        Command::Transcribe { task_id } => {
            let report = reconciler
                .transcribe(&TaskId::new(task_id))
                .await
                .context("transcribe")?;
            print_json(&report)?;
        }
    }
    Ok(())
}

/// Wait until the poll for `task_id` stops, then print the last known task.
async fn follow(
    reconciler: &TaskReconciler,
    task_id: &TaskId,
    mut events: mpsc::UnboundedReceiver<ReconcileEvent>,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => {
                warn!(task_id = %task_id, "interrupted while waiting for task");
                return Ok(());
            }
            event = events.recv() => event,
        };

        match event {
            Some(ReconcileEvent::PollStopped {
                task_id: stopped,
                reason,
                ..
            }) if &stopped == task_id && reason != StopReason::Superseded => {
                if let StopReason::FetchFailed(error) = reason {
                    return Err(anyhow!("polling task {task_id} failed: {error}"));
                }
                let task = reconciler
                    .latest_task(task_id)
                    .await
                    .context("fetch settled task")?;
                print_json(&task)?;
                return Ok(());
            }
            Some(_) => {}
            None => return Err(anyhow!("event stream closed")),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("render output")?;
    println!("{rendered}");
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::from_file(path).context("load config"),
        None => Ok(SyncConfig::default()),
    }
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
