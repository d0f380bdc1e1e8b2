use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::config::TransitionConfig;
use crate::media::{MediaItem, MediaKey};
use crate::processing::layout::ViewportSize;

/// Commands accepted by the player task.
#[derive(Debug)]
pub enum PlayerCommand {
    Show {
        item: MediaItem,
        config: TransitionConfig,
    },
    Resize(ViewportSize),
    /// The host reports that the video behind `key` has started playing.
    Playing(MediaKey),
}

/// Notifications published by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Loaded(MediaKey),
    /// The live video changed; `None` once no video is on screen.
    VideoChanged(Option<MediaKey>),
    /// A show request matched what is already on screen.
    Unchanged(MediaKey),
    /// A show request arrived before the surface had a usable size.
    Skipped(MediaKey),
}

/// Lifecycle callbacks of the surface controller.
pub trait PlaybackListener {
    fn on_loaded(&mut self, key: &MediaKey);
    fn set_video(&mut self, video: Option<&MediaItem>);
}

impl PlaybackListener for UnboundedSender<PlaybackEvent> {
    fn on_loaded(&mut self, key: &MediaKey) {
        if self.send(PlaybackEvent::Loaded(key.clone())).is_err() {
            warn!(key = %key, "playback listener dropped; loaded event lost");
        }
    }

    fn set_video(&mut self, video: Option<&MediaItem>) {
        let key = video.map(|item| item.key().clone());
        if self.send(PlaybackEvent::VideoChanged(key)).is_err() {
            warn!("playback listener dropped; video change lost");
        }
    }
}

/// Records events in order.
impl PlaybackListener for Vec<PlaybackEvent> {
    fn on_loaded(&mut self, key: &MediaKey) {
        self.push(PlaybackEvent::Loaded(key.clone()));
    }

    fn set_video(&mut self, video: Option<&MediaItem>) {
        self.push(PlaybackEvent::VideoChanged(
            video.map(|item| item.key().clone()),
        ));
    }
}
