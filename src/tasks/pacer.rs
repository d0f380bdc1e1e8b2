use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::select;
use tokio::sync::mpsc::{Sender, UnboundedReceiver};
use tokio::time::{Duration, Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{Configuration, TransitionConfig};
use crate::events::{PlaybackEvent, PlayerCommand};
use crate::media::{MediaItem, MediaKey, PlaybackStatus};
use crate::schedule::next_delay;

/// How often a held video is checked for the end of its clip.
const CLIP_END_POLL: Duration = Duration::from_millis(100);

/// `true` while `item` is a video that has not finished playing. A paused
/// clip releases the hold.
fn clip_running(item: &MediaItem) -> bool {
    item.transport().is_some_and(|transport| {
        matches!(
            transport.status(),
            PlaybackStatus::Pending | PlaybackStatus::Playing
        )
    })
}

/// One advance: how long the item stays up and how it transitions in.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAdvance {
    /// Scene time at which the item is shown.
    pub at: Duration,
    pub delay: Duration,
    pub transition: TransitionConfig,
}

pub fn plan_advance<R: Rng + ?Sized>(
    config: &Configuration,
    elapsed: Duration,
    rng: &mut R,
) -> PlannedAdvance {
    let delay = next_delay(&config.timing, elapsed, rng);
    PlannedAdvance {
        at: elapsed,
        delay,
        transition: config.resolve_transition(delay, elapsed, rng),
    }
}

/// The first `count` advances of a scene, assuming every item loads
/// instantly.
pub fn plan<R: Rng + ?Sized>(
    config: &Configuration,
    count: usize,
    rng: &mut R,
) -> Vec<PlannedAdvance> {
    let mut elapsed = Duration::ZERO;
    (0..count)
        .map(|_| {
            let advance = plan_advance(config, elapsed, rng);
            elapsed += advance.delay;
            advance
        })
        .collect()
}

/// Cycles `playlist` in order. Each item is handed to the player, and the
/// next one follows once the player confirms the show and the scheduled
/// delay has run out. With `play-full-video`, a video item additionally
/// stays up until its clip ends.
pub async fn run(
    playlist: Vec<MediaItem>,
    config: Arc<Configuration>,
    mut events: UnboundedReceiver<PlaybackEvent>,
    to_player: Sender<PlayerCommand>,
    seed: Option<u64>,
    cancel: CancellationToken,
) -> Result<()> {
    if playlist.is_empty() {
        warn!("pacer started with an empty playlist");
        return Ok(());
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let started = Instant::now();
    let mut next_index = 0usize;
    let mut awaiting: Option<(MediaKey, Duration)> = None;
    let mut deadline: Option<Instant> = Some(started);
    let mut holding: Option<MediaItem> = None;

    loop {
        let wake = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        select! {
            _ = cancel.cancelled() => break,

            _ = sleep_until(wake), if deadline.is_some() => {
                if let Some(clip) = holding.as_ref().filter(|item| clip_running(item)) {
                    trace!(key = %clip.key(), "pacer holding until clip ends");
                    deadline = Some(Instant::now() + CLIP_END_POLL);
                } else {
                    deadline = None;
                    holding = None;
                    let item = playlist[next_index % playlist.len()].clone();
                    next_index += 1;
                    let elapsed = started.elapsed();
                    let advance = plan_advance(&config, elapsed, &mut rng);
                    debug!(
                        key = %item.key(),
                        delay_ms = advance.delay.as_millis() as u64,
                        fade_ms = advance.transition.fade_duration.as_millis() as u64,
                        "pacer advancing"
                    );
                    awaiting = Some((item.key().clone(), advance.delay));
                    if config.play_full_video && item.is_video() {
                        holding = Some(item.clone());
                    }
                    to_player
                        .send(PlayerCommand::Show { item, config: advance.transition })
                        .await
                        .context("player command channel closed")?;
                }
            }

            ev = events.recv() => match ev {
                Some(
                    PlaybackEvent::Loaded(key)
                    | PlaybackEvent::Unchanged(key)
                    | PlaybackEvent::Skipped(key),
                ) => {
                    if let Some((expected, delay)) = awaiting.take_if(|(expected, _)| *expected == key) {
                        debug!(key = %expected, delay_ms = delay.as_millis() as u64, "pacer waiting");
                        deadline = Some(Instant::now() + delay);
                    }
                }
                Some(PlaybackEvent::VideoChanged(video)) => {
                    debug!(video = ?video.as_ref().map(MediaKey::as_str), "pacer saw video change");
                }
                None => {
                    debug!("playback event channel closed");
                    break;
                }
            },
        }
    }

    info!(advances = next_index, "pacer stopped");
    Ok(())
}
