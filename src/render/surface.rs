//! The playback surface: one viewport, the item on it, and everything that
//! animates around that item.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::{BackgroundMode, TransitionConfig};
use crate::events::PlaybackListener;
use crate::media::{MediaItem, MediaKey};
use crate::processing::layout::{LayoutResult, Placement, ViewportSize, fit, fit_with_backdrop};
use crate::render::backdrop::{BackdropState, BackgroundBlurRenderer, DrawTarget};
use crate::render::transition::{LayerFrame, TransitionAnimator};
use crate::timer::earliest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Nothing on screen would change.
    Unchanged,
    /// No usable viewport or nothing to lay out.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLayer {
    pub layer: LayerFrame,
    pub placement: Option<Placement>,
}

/// Everything a host needs to paint one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub viewport: ViewportSize,
    pub background: BackgroundMode,
    pub background_color: [u8; 3],
    pub backdrop: BackdropState,
    pub backdrop_placement: Option<Placement>,
    /// Bottom to top.
    pub layers: Vec<PlacedLayer>,
}

struct Shown {
    item: MediaItem,
    config: TransitionConfig,
    layout: LayoutResult,
}

pub struct PlaybackSurfaceController<S: DrawTarget, L: PlaybackListener> {
    viewport: Option<ViewportSize>,
    window: ViewportSize,
    shown: Option<Shown>,
    placements: HashMap<MediaKey, Placement>,
    animator: TransitionAnimator,
    backdrop: BackgroundBlurRenderer<S>,
    listener: L,
    live_video: Option<MediaKey>,
    layouts_applied: u64,
}

impl<S: DrawTarget, L: PlaybackListener> PlaybackSurfaceController<S, L> {
    /// `window` stands in for the viewport while the viewport reports a zero
    /// dimension.
    pub fn new(surface: S, listener: L, window: ViewportSize) -> Self {
        Self {
            viewport: None,
            window,
            shown: None,
            placements: HashMap::new(),
            animator: TransitionAnimator::new(),
            backdrop: BackgroundBlurRenderer::new(surface),
            listener,
            live_video: None,
            layouts_applied: 0,
        }
    }

    pub fn with_viewport(mut self, viewport: ViewportSize) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Viewport used for layout, if one is attached and non-empty.
    pub fn viewport(&self) -> Option<ViewportSize> {
        self.viewport
            .map(|v| v.or_window(self.window))
            .filter(|v| !v.is_empty())
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.shown.as_ref().map(|shown| &shown.item)
    }

    pub fn current_layout(&self) -> Option<&LayoutResult> {
        self.shown.as_ref().map(|shown| &shown.layout)
    }

    pub fn layouts_applied(&self) -> u64 {
        self.layouts_applied
    }

    pub fn live_video(&self) -> Option<&MediaKey> {
        self.live_video.as_ref()
    }

    pub fn animator(&self) -> &TransitionAnimator {
        &self.animator
    }

    pub fn backdrop(&self) -> &BackgroundBlurRenderer<S> {
        &self.backdrop
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn set_item(
        &mut self,
        item: MediaItem,
        config: TransitionConfig,
        now: Instant,
    ) -> ApplyOutcome {
        let Some(viewport) = self.viewport() else {
            debug!(key = %item.key(), "set_item skipped; no viewport");
            return ApplyOutcome::Skipped;
        };
        if let Some(shown) = &self.shown
            && shown.item.source_id() == item.source_id()
            && shown.config == config
        {
            debug!(key = %item.key(), "set_item unchanged");
            return ApplyOutcome::Unchanged;
        }

        if let Some(transport) = item.transport() {
            transport.set_volume(config.volume_gain());
            transport.play();
        }

        let layout = self.layout_for(viewport, &item, &config);
        self.placements.insert(item.key().clone(), layout.foreground);

        if config.background == BackgroundMode::Blur {
            self.backdrop
                .start(&item, &layout, config.background_blur, now);
        } else {
            self.backdrop.stop();
        }

        self.animator.set_item(item.clone(), &config, now);

        let video = item.is_video().then(|| item.key().clone());
        if video != self.live_video {
            self.listener
                .set_video(if video.is_some() { Some(&item) } else { None });
            self.live_video = video;
        }

        info!(
            key = %item.key(),
            kind = ?item.kind(),
            width = viewport.width,
            height = viewport.height,
            "item applied"
        );
        let key = item.key().clone();
        self.shown = Some(Shown {
            item,
            config,
            layout,
        });
        self.listener.on_loaded(&key);
        ApplyOutcome::Applied
    }

    /// Attach or resize the viewport. The current item is laid out again
    /// when the effective size changes.
    pub fn resize(&mut self, viewport: ViewportSize, now: Instant) -> ApplyOutcome {
        let before = self.viewport();
        self.viewport = Some(viewport);
        let Some(after) = self.viewport() else {
            return ApplyOutcome::Skipped;
        };
        if before == Some(after) {
            return ApplyOutcome::Unchanged;
        }
        let Some(shown) = self.shown.as_ref() else {
            return ApplyOutcome::Skipped;
        };
        let item = shown.item.clone();
        let config = shown.config.clone();
        let layout = self.layout_for(after, &item, &config);
        self.placements.insert(item.key().clone(), layout.foreground);
        if config.background == BackgroundMode::Blur {
            self.backdrop
                .start(&item, &layout, config.background_blur, now);
        }
        if let Some(shown) = self.shown.as_mut() {
            shown.layout = layout;
        }
        debug!(key = %item.key(), width = after.width, height = after.height, "surface resized");
        ApplyOutcome::Applied
    }

    pub fn on_tick(&mut self, now: Instant) {
        for key in self.animator.tick(now) {
            self.placements.remove(&key);
        }
        self.backdrop.on_tick(now);
    }

    pub fn on_playing(&mut self, key: &MediaKey, now: Instant) {
        self.backdrop.on_playing(key, now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([self.animator.next_deadline(), self.backdrop.next_deadline()])
    }

    pub fn frame(&self, now: Instant) -> Option<RenderFrame> {
        let shown = self.shown.as_ref()?;
        let layers = self
            .animator
            .sample(now)
            .into_iter()
            .map(|layer| PlacedLayer {
                placement: self.placements.get(&layer.key).copied(),
                layer,
            })
            .collect();
        Some(RenderFrame {
            viewport: shown.layout.viewport,
            background: shown.config.background,
            background_color: shown.config.background_color,
            backdrop: self.backdrop.state(),
            backdrop_placement: shown.layout.backdrop,
            layers,
        })
    }

    /// Stop every timer and release all items.
    pub fn dispose(&mut self) {
        self.backdrop.stop();
        self.animator.clear();
        self.placements.clear();
        self.shown = None;
        if self.live_video.take().is_some() {
            self.listener.set_video(None);
        }
        debug!("surface disposed");
    }

    fn layout_for(
        &mut self,
        viewport: ViewportSize,
        item: &MediaItem,
        config: &TransitionConfig,
    ) -> LayoutResult {
        self.layouts_applied += 1;
        if config.background == BackgroundMode::Blur {
            fit_with_backdrop(viewport, item.intrinsic_size())
        } else {
            fit(viewport, item.intrinsic_size())
        }
    }
}
