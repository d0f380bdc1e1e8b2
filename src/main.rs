use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rust_slideshow::config::Configuration;
use rust_slideshow::events::{PlaybackEvent, PlayerCommand};
use rust_slideshow::media::{MediaItem, StillImage};
use rust_slideshow::scan::{ScanOptions, scan_media};
use rust_slideshow::tasks::{pacer, player};

#[derive(Debug, Parser)]
#[command(name = "rust-slideshow", version, about = "headless slideshow playback engine")]
struct Args {
    /// Path to YAML scene file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Directory scanned for media
    #[arg(long, value_name = "DIR")]
    media: Option<PathBuf>,
    /// Print the first N planned advances without playing anything
    #[arg(long = "dry-run", value_name = "ADVANCES")]
    dry_run: Option<usize>,
    /// Deterministic RNG seed for timing and pan directions
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Stop after this long (e.g. `30s`, `2m`)
    #[arg(long = "run-for", value_name = "DURATION", value_parser = humantime::parse_duration)]
    run_for: Option<Duration>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        media,
        dry_run,
        seed,
        run_for,
        verbose,
    } = Args::parse();
    init_tracing(verbose);

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::debug!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    if let Some(advances) = dry_run {
        run_dry_run(&cfg, media.as_deref(), advances, seed)?;
        return Ok(());
    }

    let Some(media) = media else {
        bail!("--media is required unless --dry-run is given");
    };
    let playlist = load_playlist(&media)?;
    tracing::info!(count = playlist.len(), dir = %media.display(), "media loaded");

    let (command_tx, command_rx) = mpsc::channel::<PlayerCommand>(8); // Pacer -> Player
    let (event_tx, event_rx) = mpsc::unbounded_channel::<PlaybackEvent>(); // Player -> Pacer

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    if let Some(limit) = run_for {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(limit) => {
                    tracing::info!(?limit, "run time elapsed; initiating shutdown");
                    cancel.cancel();
                }
            }
        });
    }

    let mut tasks = JoinSet::new();

    tasks.spawn({
        let options = player::PlayerOptions {
            viewport: cfg.window,
            window: cfg.window,
            backdrop_max_sample_dim: cfg.backdrop_max_sample_dim,
        };
        let cancel = cancel.clone();
        async move {
            player::run(command_rx, event_tx, options, cancel)
                .await
                .context("player task failed")
        }
    });

    tasks.spawn({
        let cfg = Arc::new(cfg);
        let cancel = cancel.clone();
        async move {
            pacer::run(playlist, cfg, event_rx, command_tx, seed, cancel)
                .await
                .context("pacer task failed")
        }
    });

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
        // Either task finishing ends the show.
        cancel.cancel();
    }

    Ok(())
}

fn load_playlist(dir: &Path) -> Result<Vec<MediaItem>> {
    let paths = scan_media(dir, &ScanOptions::default())
        .with_context(|| format!("failed to scan {}", dir.display()))?;
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        match StillImage::open(&path) {
            Ok(still) => items.push(still.into_item()),
            Err(err) => tracing::warn!(path = %path.display(), "skipping media: {err}"),
        }
    }
    if items.is_empty() {
        bail!("no media under {} could be decoded", dir.display());
    }
    Ok(items)
}

fn run_dry_run(
    cfg: &Configuration,
    media: Option<&Path>,
    advances: usize,
    seed: Option<u64>,
) -> Result<()> {
    let paths = match media {
        Some(dir) => scan_media(dir, &ScanOptions::default())
            .with_context(|| format!("failed to scan {}", dir.display()))?,
        None => Vec::new(),
    };
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    println!(
        "# scene dry run\n# media: {}\n# advances: {}\n# seed: {}\n",
        paths.len(),
        advances,
        seed.map_or_else(|| "(random)".to_string(), |s| s.to_string())
    );

    let plan = pacer::plan(cfg, advances, &mut rng);
    if plan.is_empty() {
        println!("(nothing planned)");
        return Ok(());
    }
    for (idx, advance) in plan.iter().enumerate() {
        let item = if paths.is_empty() {
            "-".to_string()
        } else {
            paths[idx % paths.len()].display().to_string()
        };
        let t = &advance.transition;
        println!(
            "  {:>4}: at {:>8}ms  hold {:>6}ms  fade {:>5}ms  motion {:>5}ms  zoom {:.2}->{:.2}  pan ({:+.1}%, {:+.1}%)  {}",
            idx + 1,
            advance.at.as_millis(),
            advance.delay.as_millis(),
            t.fade_duration.as_millis(),
            t.trans_duration.as_millis(),
            t.zoom_start,
            t.zoom_end,
            t.horiz_trans_level,
            t.vert_trans_level,
            item
        );
    }
    Ok(())
}
