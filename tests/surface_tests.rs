use std::time::{Duration, Instant};

use rust_slideshow::config::{BackgroundMode, TransitionConfig};
use rust_slideshow::events::PlaybackEvent;
use rust_slideshow::media::testkit::{ScriptedVideo, solid_still};
use rust_slideshow::media::{MediaKey, PlaybackStatus, VideoTransport};
use rust_slideshow::processing::layout::ViewportSize;
use rust_slideshow::render::backdrop::{BackdropState, CanvasSurface, FRAME_INTERVAL};
use rust_slideshow::render::surface::{ApplyOutcome, PlaybackSurfaceController};
use rust_slideshow::render::transition::{LEAVE_HOLD_OPACITY, Phase};

type Controller = PlaybackSurfaceController<CanvasSurface, Vec<PlaybackEvent>>;

fn controller() -> Controller {
    PlaybackSurfaceController::new(CanvasSurface::new(48), Vec::new(), ViewportSize::new(1920, 1080))
        .with_viewport(ViewportSize::new(1920, 1080))
}

fn crossfade(fade_ms: u64) -> TransitionConfig {
    TransitionConfig {
        cross_fade: true,
        fade_duration: Duration::from_millis(fade_ms),
        ..TransitionConfig::default()
    }
}

fn key(k: &str) -> MediaKey {
    MediaKey::from(k)
}

#[test]
fn same_source_and_config_is_a_no_op() {
    let t0 = Instant::now();
    let mut ctl = controller();
    let cfg = crossfade(300);
    assert_eq!(
        ctl.set_item(solid_still("a.png", 800, 600), cfg.clone(), t0),
        ApplyOutcome::Applied
    );
    assert_eq!(
        ctl.set_item(solid_still("a.png", 800, 600), cfg.clone(), t0),
        ApplyOutcome::Unchanged
    );
    assert_eq!(ctl.layouts_applied(), 1);
    assert_eq!(ctl.listener(), &vec![PlaybackEvent::Loaded(key("a.png"))]);

    let fg = ctl.current_layout().unwrap().foreground;
    assert!((fg.scale - 1.8).abs() < 1e-4);
    assert!((fg.margin_left - 240.0).abs() < 1e-3);
}

#[test]
fn changed_config_reapplies_same_source() {
    let t0 = Instant::now();
    let mut ctl = controller();
    ctl.set_item(solid_still("a.png", 800, 600), crossfade(300), t0);
    let outcome = ctl.set_item(
        solid_still("a.png", 800, 600),
        TransitionConfig {
            background_blur: 2.0,
            ..crossfade(300)
        },
        t0,
    );
    assert_eq!(outcome, ApplyOutcome::Applied);
    assert_eq!(ctl.layouts_applied(), 2);
    assert_eq!(ctl.listener().len(), 2);
}

#[test]
fn video_is_started_and_announced_before_loaded() {
    let t0 = Instant::now();
    let mut ctl = controller();
    let video = ScriptedVideo::new("clip.mp4", 1280, 720, true);
    let cfg = TransitionConfig {
        video_volume: 25,
        ..TransitionConfig::default()
    };
    ctl.set_item(video.item("clip"), cfg.clone(), t0);

    assert_eq!(video.play_requests(), 1);
    assert!((video.volume() - 0.25).abs() < 1e-6);
    assert_eq!(
        ctl.listener(),
        &vec![
            PlaybackEvent::VideoChanged(Some(key("clip"))),
            PlaybackEvent::Loaded(key("clip")),
        ]
    );
    assert_eq!(ctl.backdrop().state(), BackdropState::Sampling);

    // Repeating the same show neither restarts playback nor re-announces.
    ctl.set_item(video.item("clip"), cfg, t0);
    assert_eq!(video.play_requests(), 1);
    assert_eq!(ctl.listener().len(), 2);
}

#[test]
fn switching_to_a_still_clears_live_video() {
    let t0 = Instant::now();
    let mut ctl = controller();
    let video = ScriptedVideo::new("clip.mp4", 1280, 720, true);
    ctl.set_item(video.item("clip"), TransitionConfig::default(), t0);
    ctl.set_item(solid_still("b.png", 10, 10), TransitionConfig::default(), t0);
    assert_eq!(
        ctl.listener()[2..],
        [
            PlaybackEvent::VideoChanged(None),
            PlaybackEvent::Loaded(key("b.png")),
        ]
    );
    assert_eq!(ctl.live_video(), None);
    assert_eq!(ctl.backdrop().state(), BackdropState::Static);
}

#[test]
fn still_to_still_does_not_touch_video_listener() {
    let t0 = Instant::now();
    let mut ctl = controller();
    ctl.set_item(solid_still("a.png", 10, 10), TransitionConfig::default(), t0);
    ctl.set_item(solid_still("b.png", 10, 10), TransitionConfig::default(), t0);
    assert!(
        ctl.listener()
            .iter()
            .all(|ev| matches!(ev, PlaybackEvent::Loaded(_)))
    );
}

#[test]
fn crossfade_keeps_leaving_layer_visible_until_disposed() {
    let t0 = Instant::now();
    let mut ctl = controller();
    let cfg = crossfade(400);
    ctl.set_item(solid_still("a.png", 800, 600), cfg.clone(), t0);
    ctl.set_item(solid_still("b.png", 600, 800), cfg, t0);

    let mut last_entering = 0.0;
    let mut now = t0;
    while let Some(deadline) = ctl.next_deadline().filter(|d| *d <= t0 + Duration::from_secs(1)) {
        let step = now + Duration::from_millis(10);
        now = step.min(deadline);
        ctl.on_tick(now);
        let Some(frame) = ctl.frame(now) else { break };
        for placed in &frame.layers {
            match placed.layer.phase {
                Phase::Leaving => assert!(placed.layer.opacity >= LEAVE_HOLD_OPACITY),
                _ => {
                    assert!(placed.layer.opacity >= last_entering);
                    last_entering = placed.layer.opacity;
                }
            }
            assert!(placed.placement.is_some());
        }
    }
    let frame = ctl.frame(now).unwrap();
    assert_eq!(frame.layers.len(), 1);
    assert_eq!(frame.layers[0].layer.key, key("b.png"));
    assert_eq!(frame.layers[0].layer.opacity, 1.0);
}

#[test]
fn no_blur_background_stops_backdrop() {
    let t0 = Instant::now();
    let mut ctl = controller();
    let video = ScriptedVideo::new("clip.mp4", 1280, 720, true);
    ctl.set_item(video.item("clip"), TransitionConfig::default(), t0);
    assert!(ctl.next_deadline().is_some());

    let color = TransitionConfig {
        background: BackgroundMode::Color,
        background_color: [10, 20, 30],
        ..TransitionConfig::default()
    };
    ctl.set_item(solid_still("b.png", 10, 10), color, t0);
    assert_eq!(ctl.backdrop().state(), BackdropState::Idle);
    assert!(ctl.current_layout().unwrap().backdrop.is_none());
    let frame = ctl.frame(t0).unwrap();
    assert_eq!(frame.background, BackgroundMode::Color);
    assert_eq!(frame.background_color, [10, 20, 30]);
}

#[test]
fn rapid_swaps_leave_a_single_sampling_timer() {
    let t0 = Instant::now();
    let mut ctl = controller();
    let videos: Vec<_> = (0..5)
        .map(|i| ScriptedVideo::new(&format!("clip{i}.mp4"), 640, 360, true))
        .collect();
    for (i, video) in videos.iter().enumerate() {
        let at = t0 + Duration::from_millis(i as u64);
        ctl.set_item(video.item(&format!("clip{i}")), TransitionConfig::default(), at);
    }
    let served_before: Vec<u64> = videos.iter().map(|v| v.frames_served()).collect();
    let mut now = t0;
    for _ in 0..10 {
        now += FRAME_INTERVAL;
        ctl.on_tick(now);
    }
    for (i, video) in videos.iter().enumerate().take(4) {
        assert_eq!(video.frames_served(), served_before[i], "clip{i} still sampled");
    }
    assert!(videos[4].frames_served() > served_before[4]);
}

#[test]
fn armed_video_starts_on_playing_notification() {
    let t0 = Instant::now();
    let mut ctl = controller();
    let video = ScriptedVideo::new("clip.mp4", 1280, 720, false);
    ctl.set_item(video.item("clip"), TransitionConfig::default(), t0);
    assert_eq!(ctl.backdrop().state(), BackdropState::Armed);
    video.set_status(PlaybackStatus::Playing);
    ctl.on_playing(&key("clip"), t0);
    assert_eq!(ctl.backdrop().state(), BackdropState::Sampling);
}

#[test]
fn dispose_clears_everything() {
    let t0 = Instant::now();
    let mut ctl = controller();
    let video = ScriptedVideo::new("clip.mp4", 1280, 720, true);
    ctl.set_item(solid_still("a.png", 10, 10), crossfade(500), t0);
    ctl.set_item(video.item("clip"), crossfade(500), t0);
    ctl.dispose();

    assert_eq!(ctl.next_deadline(), None);
    assert!(ctl.current().is_none());
    assert!(ctl.frame(t0).is_none());
    assert_eq!(ctl.listener().last(), Some(&PlaybackEvent::VideoChanged(None)));
    let served = video.frames_served();
    ctl.on_tick(t0 + Duration::from_secs(1));
    assert_eq!(video.frames_served(), served);

    // Disposing twice is harmless and does not re-announce.
    let events = ctl.listener().len();
    ctl.dispose();
    assert_eq!(ctl.listener().len(), events);
}
