//! Crossfade and zoom/pan animation for the items currently on screen.
//!
//! Every rendered item is a [`Layer`] keyed by its [`MediaKey`]. The current
//! item sits on top; items that were replaced stay underneath as leaving
//! layers until their fade has run out, then they are dropped.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, trace};

use crate::config::TransitionConfig;
use crate::media::{MediaItem, MediaKey};
use crate::timer::{TimerSlot, earliest};

/// Leaving layers hold just under full opacity so the entering layer keeps
/// compositing over them instead of flashing the background through.
pub const LEAVE_HOLD_OPACITY: f32 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tween {
    from: f32,
    to: f32,
    start: Instant,
    duration: Duration,
    easing: Easing,
}

impl Tween {
    fn new(from: f32, to: f32, start: Instant, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            start,
            duration,
            easing,
        }
    }

    fn settled(value: f32, now: Instant) -> Self {
        Self::new(value, value, now, Duration::ZERO, Easing::Linear)
    }

    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    fn value_at(&self, now: Instant) -> f32 {
        let t = self.easing.apply(self.progress(now));
        self.from + (self.to - self.from) * t
    }

    fn end(&self) -> Instant {
        self.start + self.duration
    }

    fn is_done(&self, now: Instant) -> bool {
        now >= self.end()
    }
}

/// Zoom and pan parameters of one item, compared to decide whether a
/// re-selected item restarts its motion.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MotionParams {
    zoom_start: f32,
    zoom_end: f32,
    horiz_pct: f32,
    vert_pct: f32,
    duration: Duration,
    easing: Easing,
}

impl From<&TransitionConfig> for MotionParams {
    fn from(config: &TransitionConfig) -> Self {
        Self {
            zoom_start: config.zoom_start,
            zoom_end: config.zoom_end,
            horiz_pct: config.horiz_trans_level,
            vert_pct: config.vert_trans_level,
            duration: config.trans_duration,
            easing: config.easing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Motion {
    params: MotionParams,
    start: Instant,
}

impl Motion {
    fn sample(&self, now: Instant) -> (f32, (f32, f32)) {
        let params = &self.params;
        let zoom = Tween::new(
            params.zoom_start,
            params.zoom_end,
            self.start,
            params.duration,
            params.easing,
        );
        let eased = params.easing.apply(zoom.progress(now));
        (
            zoom.value_at(now),
            (params.horiz_pct * eased, params.vert_pct * eased),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Entering,
    Steady,
    Leaving,
}

#[derive(Debug, Clone)]
pub struct Layer {
    item: MediaItem,
    phase: Phase,
    opacity: Tween,
    motion: Motion,
    dispose: TimerSlot,
}

impl Layer {
    pub fn item(&self) -> &MediaItem {
        &self.item
    }

    pub fn key(&self) -> &MediaKey {
        self.item.key()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

/// Render state of one layer at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFrame {
    pub key: MediaKey,
    pub phase: Phase,
    pub opacity: f32,
    pub scale: f32,
    /// Translation in percent of the element's own size.
    pub translate_pct: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    Fresh,
    /// A leaving layer with the same key was brought back with its motion
    /// intact.
    Reused,
    /// Same item as before; only its motion restarted.
    Restarted,
    Unchanged,
}

/// Ordered bottom to top; the current item, if any, is the last layer.
#[derive(Debug, Default)]
pub struct TransitionAnimator {
    layers: Vec<Layer>,
    has_current: bool,
    mounted: bool,
}

impl TransitionAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&MediaItem> {
        if self.has_current {
            self.layers.last().map(Layer::item)
        } else {
            None
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn contains(&self, key: &MediaKey) -> bool {
        self.position(key).is_some()
    }

    pub fn leaving_count(&self) -> usize {
        self.layers
            .iter()
            .filter(|layer| layer.phase == Phase::Leaving)
            .count()
    }

    pub fn set_item(
        &mut self,
        item: MediaItem,
        config: &TransitionConfig,
        now: Instant,
    ) -> EnterOutcome {
        let params = MotionParams::from(config);

        if let Some(current) = self.current_mut()
            && current.item.key() == item.key()
        {
            current.item = item;
            if current.motion.params == params {
                return EnterOutcome::Unchanged;
            }
            current.motion = Motion { params, start: now };
            debug!(key = %current.item.key(), "transition motion restarted");
            return EnterOutcome::Restarted;
        }

        if self.has_current
            && let Some(previous) = self.layers.last_mut()
        {
            let hold = if config.cross_fade {
                LEAVE_HOLD_OPACITY
            } else {
                1.0
            };
            let from = if config.cross_fade {
                previous.opacity.value_at(now)
            } else {
                1.0
            };
            previous.phase = Phase::Leaving;
            previous.opacity = Tween::new(from, hold, now, config.fade_duration, Easing::Linear);
            previous.dispose.arm(now + config.fade_duration);
            debug!(
                key = %previous.item.key(),
                fade_ms = config.fade_duration.as_millis() as u64,
                "transition leave"
            );
        }

        let outcome = if let Some(idx) = self.position(item.key()) {
            let mut layer = self.layers.remove(idx);
            let from = layer.opacity.value_at(now);
            layer.item = item;
            layer.phase = Phase::Entering;
            layer.dispose.cancel();
            layer.opacity = if config.cross_fade {
                Tween::new(from, 1.0, now, config.fade_duration, Easing::Linear)
            } else {
                Tween::settled(1.0, now)
            };
            debug!(key = %layer.item.key(), "transition re-entered leaving layer");
            self.layers.push(layer);
            EnterOutcome::Reused
        } else {
            let opacity = if !self.mounted || !config.cross_fade {
                Tween::settled(1.0, now)
            } else {
                Tween::new(0.0, 1.0, now, config.fade_duration, Easing::Linear)
            };
            debug!(key = %item.key(), first = !self.mounted, "transition enter");
            self.layers.push(Layer {
                item,
                phase: Phase::Entering,
                opacity,
                motion: Motion { params, start: now },
                dispose: TimerSlot::new(),
            });
            EnterOutcome::Fresh
        };

        self.has_current = true;
        self.mounted = true;
        self.settle(now);
        outcome
    }

    /// Advance phases and drop layers whose leave has finished. Returns the
    /// keys that were disposed.
    pub fn tick(&mut self, now: Instant) -> Vec<MediaKey> {
        let top = self.layers.len().saturating_sub(1);
        let has_current = self.has_current;
        let mut disposed = Vec::new();
        let mut idx = 0;
        self.layers.retain_mut(|layer| {
            let is_current = idx == top && has_current;
            idx += 1;
            if !is_current && layer.dispose.fire_if_due(now) {
                trace!(key = %layer.item.key(), "transition layer disposed");
                disposed.push(layer.item.key().clone());
                return false;
            }
            true
        });
        self.settle(now);
        disposed
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(self.layers.iter().map(|layer| match layer.phase {
            Phase::Entering => Some(layer.opacity.end()),
            Phase::Leaving => layer.dispose.deadline(),
            Phase::Steady => None,
        }))
    }

    pub fn sample(&self, now: Instant) -> Vec<LayerFrame> {
        self.layers
            .iter()
            .map(|layer| {
                let (scale, translate_pct) = layer.motion.sample(now);
                LayerFrame {
                    key: layer.item.key().clone(),
                    phase: layer.phase,
                    opacity: layer.opacity.value_at(now),
                    scale,
                    translate_pct,
                }
            })
            .collect()
    }

    /// Drop every layer and cancel all pending leaves.
    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.dispose.cancel();
        }
        self.layers.clear();
        self.has_current = false;
        self.mounted = false;
    }

    fn settle(&mut self, now: Instant) {
        for layer in &mut self.layers {
            if layer.phase == Phase::Entering && layer.opacity.is_done(now) {
                layer.phase = Phase::Steady;
            }
        }
    }

    fn current_mut(&mut self) -> Option<&mut Layer> {
        if self.has_current {
            self.layers.last_mut()
        } else {
            None
        }
    }

    fn position(&self, key: &MediaKey) -> Option<usize> {
        self.layers.iter().position(|layer| layer.item.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testkit::solid_still;

    fn crossfade(fade_ms: u64) -> TransitionConfig {
        TransitionConfig {
            cross_fade: true,
            fade_duration: Duration::from_millis(fade_ms),
            ..TransitionConfig::default()
        }
    }

    #[test]
    fn easing_endpoints_are_stable() {
        for ease in [
            Easing::Linear,
            Easing::InQuad,
            Easing::OutQuad,
            Easing::InOutQuad,
            Easing::InCubic,
            Easing::OutCubic,
            Easing::InOutCubic,
        ] {
            assert_eq!(ease.apply(0.0), 0.0);
            assert_eq!(ease.apply(1.0), 1.0);
            assert!(ease.apply(0.25) < ease.apply(0.75));
        }
    }

    #[test]
    fn first_item_is_fully_opaque() {
        let t0 = Instant::now();
        let mut anim = TransitionAnimator::new();
        anim.set_item(solid_still("a.png", 10, 10), &crossfade(500), t0);
        let frames = anim.sample(t0);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opacity, 1.0);
        assert_eq!(frames[0].phase, Phase::Steady);
    }

    #[test]
    fn crossfade_enters_and_holds_leaving_layer() {
        let t0 = Instant::now();
        let cfg = crossfade(400);
        let mut anim = TransitionAnimator::new();
        anim.set_item(solid_still("a.png", 10, 10), &cfg, t0);
        anim.set_item(solid_still("b.png", 10, 10), &cfg, t0);

        let mid = anim.sample(t0 + Duration::from_millis(200));
        assert_eq!(mid[0].key.as_str(), "a.png");
        assert_eq!(mid[0].phase, Phase::Leaving);
        assert!(mid[0].opacity >= LEAVE_HOLD_OPACITY);
        assert!((mid[1].opacity - 0.5).abs() < 1e-3);

        assert!(anim.tick(t0 + Duration::from_millis(399)).is_empty());
        let end = t0 + Duration::from_millis(400);
        assert_eq!(anim.next_deadline(), Some(end));
        let gone = anim.tick(end);
        assert_eq!(gone, vec![MediaKey::from("a.png")]);
        let frames = anim.sample(end);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opacity, 1.0);
        assert_eq!(frames[0].phase, Phase::Steady);
        assert_eq!(anim.next_deadline(), None);
    }

    #[test]
    fn hard_cut_snaps_both_layers() {
        let t0 = Instant::now();
        let cfg = TransitionConfig {
            cross_fade: false,
            fade_duration: Duration::from_millis(300),
            ..TransitionConfig::default()
        };
        let mut anim = TransitionAnimator::new();
        anim.set_item(solid_still("a.png", 10, 10), &cfg, t0);
        anim.set_item(solid_still("b.png", 10, 10), &cfg, t0);
        for frame in anim.sample(t0 + Duration::from_millis(10)) {
            assert_eq!(frame.opacity, 1.0);
        }
        assert_eq!(anim.leaving_count(), 1);
    }

    #[test]
    fn returning_key_keeps_motion_state() {
        let t0 = Instant::now();
        let cfg = TransitionConfig {
            zoom_start: 1.0,
            zoom_end: 2.0,
            trans_duration: Duration::from_millis(1000),
            ..crossfade(1000)
        };
        let mut anim = TransitionAnimator::new();
        anim.set_item(solid_still("a.png", 10, 10), &cfg, t0);
        let t1 = t0 + Duration::from_millis(500);
        anim.set_item(solid_still("b.png", 10, 10), &cfg, t1);
        let t2 = t0 + Duration::from_millis(600);
        let outcome = anim.set_item(solid_still("a.png", 10, 10), &cfg, t2);
        assert_eq!(outcome, EnterOutcome::Reused);

        let frames = anim.sample(t2);
        let a = frames.last().unwrap();
        assert_eq!(a.key.as_str(), "a.png");
        assert!((a.scale - 1.6).abs() < 1e-3);
        assert_eq!(anim.layers().len(), 2);
    }

    #[test]
    fn same_item_same_motion_is_unchanged() {
        let t0 = Instant::now();
        let cfg = crossfade(100);
        let mut anim = TransitionAnimator::new();
        anim.set_item(solid_still("a.png", 10, 10), &cfg, t0);
        assert_eq!(
            anim.set_item(solid_still("a.png", 10, 10), &cfg, t0),
            EnterOutcome::Unchanged
        );
        let zoomed = TransitionConfig {
            zoom_end: 3.0,
            ..cfg
        };
        assert_eq!(
            anim.set_item(solid_still("a.png", 10, 10), &zoomed, t0),
            EnterOutcome::Restarted
        );
    }

    #[test]
    fn clear_drops_everything() {
        let t0 = Instant::now();
        let cfg = crossfade(100);
        let mut anim = TransitionAnimator::new();
        anim.set_item(solid_still("a.png", 10, 10), &cfg, t0);
        anim.set_item(solid_still("b.png", 10, 10), &cfg, t0);
        anim.clear();
        assert!(anim.current().is_none());
        assert_eq!(anim.next_deadline(), None);
        assert!(anim.tick(t0 + Duration::from_secs(1)).is_empty());
    }
}
