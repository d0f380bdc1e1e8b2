use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, UnboundedSender};
use tokio::time::{Duration, Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{PlaybackEvent, PlayerCommand};
use crate::processing::layout::ViewportSize;
use crate::render::backdrop::CanvasSurface;
use crate::render::surface::{ApplyOutcome, PlaybackSurfaceController};

/// Wake-up used only to give `select!` a concrete future when nothing is
/// scheduled; the branch is disabled in that case.
const IDLE_WAKE: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
pub struct PlayerOptions {
    /// Initial viewport; may be empty until the host sends a resize.
    pub viewport: ViewportSize,
    pub window: ViewportSize,
    pub backdrop_max_sample_dim: u32,
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

/// Owns the playback surface. Applies show/resize commands as they arrive and
/// sleeps until the surface's next timer is due.
pub async fn run(
    mut commands: Receiver<PlayerCommand>,
    events: UnboundedSender<PlaybackEvent>,
    options: PlayerOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let mut surface = PlaybackSurfaceController::new(
        CanvasSurface::new(options.backdrop_max_sample_dim),
        events.clone(),
        options.window,
    )
    .with_viewport(options.viewport);

    loop {
        let deadline = surface.next_deadline();
        let wake = deadline
            .map(Instant::from_std)
            .unwrap_or_else(|| Instant::now() + IDLE_WAKE);
        select! {
            _ = cancel.cancelled() => break,

            cmd = commands.recv() => match cmd {
                Some(PlayerCommand::Show { item, config }) => {
                    let key = item.key().clone();
                    match surface.set_item(item, config, now()) {
                        ApplyOutcome::Applied => {}
                        ApplyOutcome::Unchanged => {
                            if events.send(PlaybackEvent::Unchanged(key.clone())).is_err() {
                                warn!(key = %key, "playback listener dropped; unchanged event lost");
                            }
                        }
                        ApplyOutcome::Skipped => {
                            warn!(key = %key, "show skipped; viewport not ready");
                            if events.send(PlaybackEvent::Skipped(key.clone())).is_err() {
                                warn!(key = %key, "playback listener dropped; skipped event lost");
                            }
                        }
                    }
                }
                Some(PlayerCommand::Resize(viewport)) => {
                    let outcome = surface.resize(viewport, now());
                    debug!(width = viewport.width, height = viewport.height, ?outcome, "player resize");
                }
                Some(PlayerCommand::Playing(key)) => surface.on_playing(&key, now()),
                None => {
                    debug!("player command channel closed");
                    break;
                }
            },

            _ = sleep_until(wake), if deadline.is_some() => {
                surface.on_tick(now());
            }
        }
    }

    surface.dispose();
    info!(layouts = surface.layouts_applied(), "player stopped");
    Ok(())
}
