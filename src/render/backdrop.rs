//! Blurred backdrop behind the contained foreground.
//!
//! Stills get one filtered copy when they are shown. Videos are resampled
//! every [`FRAME_INTERVAL`] while they play; the renderer owns that single
//! repeating deadline and clears it whenever playback stops or the item
//! changes.

use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::{debug, trace, warn};

use crate::media::{MediaItem, MediaKey, MediaKind, PlaybackStatus};
use crate::processing::blur::compose_backdrop;
use crate::processing::layout::{LayoutResult, Placement, ViewportSize};
use crate::timer::TimerSlot;

/// Resample period for playing video.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(20);

/// Where backdrop pixels end up.
pub trait DrawTarget {
    /// Clear and size the target for a new item.
    fn reset(&mut self, viewport: ViewportSize);
    /// Copy one live video frame, blurred, at `placement`.
    fn draw_frame(&mut self, frame: &RgbaImage, placement: &Placement, sigma: f32);
    /// Mirror a still source with the blur filter applied.
    fn show_filtered(&mut self, frame: &RgbaImage, placement: &Placement, sigma: f32);
}

/// CPU backdrop: composes into an owned [`RgbaImage`] at reduced resolution.
#[derive(Debug, Clone)]
pub struct CanvasSurface {
    viewport: ViewportSize,
    max_sample_dim: u32,
    image: Option<RgbaImage>,
    frame_copies: u64,
    filtered: bool,
}

impl CanvasSurface {
    pub fn new(max_sample_dim: u32) -> Self {
        Self {
            viewport: ViewportSize::default(),
            max_sample_dim: max_sample_dim.max(1),
            image: None,
            frame_copies: 0,
            filtered: false,
        }
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    /// Live frames copied since construction.
    pub fn frame_copies(&self) -> u64 {
        self.frame_copies
    }

    /// Whether the current content is a static filtered copy.
    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    fn compose(&mut self, frame: &RgbaImage, placement: &Placement, sigma: f32) -> bool {
        match compose_backdrop(frame, self.viewport, placement, sigma, self.max_sample_dim) {
            Ok(image) => {
                self.image = Some(image);
                true
            }
            Err(err) => {
                warn!(error = ?err, "backdrop compose failed");
                false
            }
        }
    }
}

impl DrawTarget for CanvasSurface {
    fn reset(&mut self, viewport: ViewportSize) {
        self.viewport = viewport;
        self.image = None;
        self.filtered = false;
    }

    fn draw_frame(&mut self, frame: &RgbaImage, placement: &Placement, sigma: f32) {
        if self.compose(frame, placement, sigma) {
            self.frame_copies += 1;
            self.filtered = false;
        }
    }

    fn show_filtered(&mut self, frame: &RgbaImage, placement: &Placement, sigma: f32) {
        if self.compose(frame, placement, sigma) {
            self.filtered = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackdropState {
    Idle,
    /// A still or animated still was drawn once; nothing is scheduled.
    Static,
    /// Waiting for the video to report that it started playing.
    Armed,
    /// Copying video frames on a timer.
    Sampling,
}

pub struct BackgroundBlurRenderer<S: DrawTarget> {
    surface: S,
    state: BackdropState,
    item: Option<MediaItem>,
    placement: Option<Placement>,
    sigma: f32,
    timer: TimerSlot,
}

impl<S: DrawTarget> BackgroundBlurRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            state: BackdropState::Idle,
            item: None,
            placement: None,
            sigma: 0.0,
            timer: TimerSlot::new(),
        }
    }

    pub fn state(&self) -> BackdropState {
        self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn item_key(&self) -> Option<&MediaKey> {
        self.item.as_ref().map(MediaItem::key)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Begin mirroring `item` into the backdrop using the cover geometry in
    /// `layout`. Any previous item is stopped first.
    pub fn start(&mut self, item: &MediaItem, layout: &LayoutResult, sigma: f32, now: Instant) {
        self.stop();
        let Some(placement) = layout.backdrop else {
            debug!(key = %item.key(), "backdrop start without cover geometry");
            return;
        };
        self.surface.reset(layout.viewport);
        self.item = Some(item.clone());
        self.placement = Some(placement);
        self.sigma = sigma;

        match item.kind() {
            MediaKind::Still | MediaKind::AnimatedStill => {
                if let Some(frame) = item.source().frame() {
                    self.surface.show_filtered(&frame, &placement, sigma);
                    self.state = BackdropState::Static;
                }
                debug!(key = %item.key(), state = ?self.state, "backdrop static");
            }
            MediaKind::Video => {
                let status = item
                    .transport()
                    .map(|t| t.status())
                    .unwrap_or(PlaybackStatus::Ended);
                match status {
                    PlaybackStatus::Playing => self.begin_sampling(now),
                    PlaybackStatus::Pending | PlaybackStatus::Paused => {
                        self.state = BackdropState::Armed;
                        debug!(key = %item.key(), "backdrop armed until playback starts");
                    }
                    PlaybackStatus::Ended => {
                        debug!(key = %item.key(), "backdrop not started; video already ended");
                    }
                }
            }
        }
    }

    /// Cancel sampling and forget the item. Safe to call at any time.
    pub fn stop(&mut self) {
        self.timer.cancel();
        if self.state != BackdropState::Idle {
            trace!(state = ?self.state, "backdrop stopped");
        }
        self.state = BackdropState::Idle;
        self.item = None;
        self.placement = None;
    }

    /// The video behind `key` started playing.
    pub fn on_playing(&mut self, key: &MediaKey, now: Instant) {
        if self.state != BackdropState::Armed || self.item_key() != Some(key) {
            return;
        }
        self.begin_sampling(now);
    }

    /// Run the sampling deadline if it is due. Returns `true` when a frame
    /// was copied.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        if !self.timer.fire_if_due(now) {
            return false;
        }
        let status = self
            .item
            .as_ref()
            .and_then(MediaItem::transport)
            .map(|t| t.status())
            .unwrap_or(PlaybackStatus::Ended);
        match status {
            PlaybackStatus::Playing => {
                let copied = self.copy_frame();
                self.timer.arm(now + FRAME_INTERVAL);
                copied
            }
            PlaybackStatus::Pending | PlaybackStatus::Paused => {
                debug!(key = ?self.item_key().map(MediaKey::as_str), "backdrop sampling paused");
                self.state = BackdropState::Armed;
                false
            }
            PlaybackStatus::Ended => {
                debug!(key = ?self.item_key().map(MediaKey::as_str), "backdrop sampling ended");
                self.state = BackdropState::Idle;
                false
            }
        }
    }

    fn begin_sampling(&mut self, now: Instant) {
        self.state = BackdropState::Sampling;
        self.copy_frame();
        self.timer.arm(now + FRAME_INTERVAL);
        debug!(key = ?self.item_key().map(MediaKey::as_str), "backdrop sampling started");
    }

    fn copy_frame(&mut self) -> bool {
        let (Some(item), Some(placement)) = (self.item.as_ref(), self.placement.as_ref()) else {
            return false;
        };
        match item.source().frame() {
            Some(frame) => {
                self.surface.draw_frame(&frame, placement, self.sigma);
                true
            }
            None => false,
        }
    }
}

impl<S: DrawTarget> Drop for BackgroundBlurRenderer<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
