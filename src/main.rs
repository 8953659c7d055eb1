use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tripkik::artifact::GifAnimationEncoder;
use tripkik::kernel::state::SessionState;
use tripkik::kernel::time::SystemClock;
use tripkik::memory::history::HistoryStore;
use tripkik::memory::store::FileStore;
use tripkik::outputs::{render, render_history, HistoryView, Route, Router};
use tripkik::vision::camera::SyntheticCamera;
use tripkik::{SessionReactor, TripkikConfig};

#[derive(Parser)]
#[command(name = "tripkik")]
#[command(about = "Timed three-shot classroom evaluations with an animated proof", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one session against the synthetic camera and archive it
    Run {
        /// Score given after the result capture (1-4)
        #[arg(long, default_value_t = 3)]
        score: u8,
        /// Delay between the prompt and the answer captures
        #[arg(long, default_value_t = 1500)]
        think_ms: u64,
        /// Delay between the answer and the result captures
        #[arg(long, default_value_t = 1000)]
        settle_ms: u64,
        /// Directory the GIF is written to (defaults to the storage dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print archived sessions, most recent first
    History,
    /// Print the view a URL fragment selects (`#home`, `#historique`)
    View {
        #[arg(default_value = "#home")]
        fragment: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = TripkikConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Run {
            score,
            think_ms,
            settle_ms,
            out,
        } => run_session(&config, score, think_ms, settle_ms, out).await,
        Commands::History => show_view(&config, Route::History.fragment()),
        Commands::View { fragment } => show_view(&config, &fragment),
    }
}

fn show_view(config: &TripkikConfig, fragment: &str) -> Result<()> {
    let mut router = Router::new();
    if router.navigate(fragment) {
        tracing::debug!("Switched to {}", router.current().fragment());
    }
    let Some(section) = router.current().section_id() else {
        tracing::warn!("No view matches {:?}; nothing to show", fragment);
        return Ok(());
    };
    tracing::debug!("Showing section {}", section);

    match router.current() {
        Route::History => {
            let store = FileStore::new(&config.storage.dir)?;
            let history = HistoryStore::with_key(store, config.storage.history_key.clone());
            print_history(&history.list()?);
        }
        route => {
            let ui = render(&SessionState::new(), route);
            if let Some(primary) = ui.primary {
                println!("{}", primary.label);
                if let Some(comment) = primary.comment {
                    println!("  {comment}");
                }
            }
        }
    }
    Ok(())
}

async fn run_session(
    config: &TripkikConfig,
    score: u8,
    think_ms: u64,
    settle_ms: u64,
    out: Option<PathBuf>,
) -> Result<()> {
    let camera = SyntheticCamera::new(config.camera.width, config.camera.height);
    let store = FileStore::new(&config.storage.dir)?;
    let mut reactor = SessionReactor::from_config(
        config,
        camera,
        Arc::new(GifAnimationEncoder::new()),
        store,
        Arc::new(SystemClock),
    )?;

    let reset = reactor.reset_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupted; resetting session (Ctrl-C again to quit)");
        reset.reset();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    // Arm, then prompt / answer / result.
    let pauses = [0, 0, think_ms, settle_ms];
    for pause in pauses {
        if pause > 0 {
            tokio::time::sleep(Duration::from_millis(pause)).await;
        }
        reactor.press().await;
        if let Some(status) = reactor.ui(&Route::Home).status {
            tracing::info!("{}", status.text);
        }
        if !reactor.state().camera_ready() && !matches!(reactor.state(), SessionState::AwaitingScore { .. }) {
            break;
        }
    }

    if !matches!(reactor.state(), SessionState::AwaitingScore { .. }) {
        bail!("session stopped early in state {}", reactor.state().name());
    }

    reactor.select_score(score).await?;

    match reactor.state() {
        SessionState::Completed { artifact, record } => {
            let dir = out.unwrap_or_else(|| config.storage.dir.clone());
            let path = artifact.save_in(&dir)?;
            println!("{} ({} bytes)", path.display(), artifact.bytes.len());
            println!("Durée: {}s / Score: {}", record.duration_s, record.score);
            Ok(())
        }
        SessionState::Failed { failure } => bail!("session failed: {}", failure.message),
        other => bail!("session ended in unexpected state {}", other.name()),
    }
}

fn print_history(records: &[tripkik::memory::history::HistoryRecord]) {
    match render_history(records) {
        HistoryView::Empty { message } => println!("{message}"),
        HistoryView::Entries(lines) => {
            for line in lines {
                println!("{}\n  {}\n  {}", line.heading, line.summary, line.recommendation);
            }
        }
    }
}
