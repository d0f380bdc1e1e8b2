use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use rand::Rng;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::processing::layout::ViewportSize;
use crate::render::transition::Easing;
use crate::schedule::{
    DurationTiming, FALLBACK_INTERVAL, MAX_SIN_RATE, TimingConfig, coerce_millis, period_for_rate,
};

/// Top-level scene file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// How long each item stays up before the next advance.
    #[serde(deserialize_with = "scene_timing")]
    pub timing: TimingConfig,
    pub effects: EffectSettings,
    pub background: BackgroundSettings,
    /// Playback volume for video items, `0..=100`.
    pub video_volume: u8,
    /// Window size substituted while the viewport has not been sized yet.
    pub window: ViewportSize,
    /// Longest edge of the working canvas used to compose blurred backdrops.
    pub backdrop_max_sample_dim: u32,
    /// Hold the advance on a video item until the clip has finished.
    pub play_full_video: bool,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene file {}", path.display()))?;
        serde_yaml::from_str(&s)
            .with_context(|| format!("failed to parse scene file {}", path.display()))
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        check_bounds("timing", &DurationTiming::Timed(self.timing))?;
        self.effects.validate()?;
        self.background.validate()?;
        ensure!(
            self.video_volume <= 100,
            "video-volume must be between 0 and 100"
        );
        ensure!(!self.window.is_empty(), "window must have a non-zero size");
        ensure!(
            self.backdrop_max_sample_dim > 0,
            "backdrop-max-sample-dim must be greater than zero"
        );
        Ok(self)
    }

    /// Resolve the per-item transition settings for an advance that will
    /// keep the item on screen for `scene_delay`. `elapsed` is the time since
    /// the scene started.
    pub fn resolve_transition<R: Rng + ?Sized>(
        &self,
        scene_delay: Duration,
        elapsed: Duration,
        rng: &mut R,
    ) -> TransitionConfig {
        let effects = &self.effects;
        let (zoom_start, zoom_end, horiz, vert) = if effects.zoom {
            (
                effects.zoom_start,
                effects.zoom_end,
                effects.horiz_trans.offset(rng),
                effects.vert_trans.offset(rng),
            )
        } else {
            (1.0, 1.0, 0.0, 0.0)
        };
        TransitionConfig {
            zoom_start,
            zoom_end,
            horiz_trans_level: horiz,
            vert_trans_level: vert,
            trans_duration: effects.transition.resolve(scene_delay, elapsed, rng),
            cross_fade: effects.cross_fade,
            fade_duration: effects.fade.resolve(scene_delay, elapsed, rng),
            background: self.background.kind,
            background_color: self.background.color,
            background_blur: self.background.blur,
            video_volume: self.video_volume,
            easing: effects.easing,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            timing: TimingDefaults::SCENE.constant_timing(),
            effects: EffectSettings::default(),
            background: BackgroundSettings::default(),
            video_volume: 0,
            window: ViewportSize::new(1920, 1080),
            backdrop_max_sample_dim: Self::default_backdrop_max_sample_dim(),
            play_full_video: false,
        }
    }
}

impl Configuration {
    const fn default_backdrop_max_sample_dim() -> u32 {
        2048
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawEffects")]
pub struct EffectSettings {
    /// Enables zoom and pan for every item.
    pub zoom: bool,
    pub zoom_start: f32,
    pub zoom_end: f32,
    pub horiz_trans: HorizontalTrans,
    pub vert_trans: VerticalTrans,
    /// Duration of the zoom/pan motion.
    pub transition: DurationTiming,
    pub cross_fade: bool,
    pub fade: DurationTiming,
    pub easing: Easing,
}

impl EffectSettings {
    const fn default_zoom_start() -> f32 {
        1.0
    }

    const fn default_zoom_end() -> f32 {
        2.0
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.zoom_start > 0.0 && self.zoom_end > 0.0,
            "effects.zoom-start and effects.zoom-end must be positive"
        );
        check_bounds("effects.transition", &self.transition)?;
        check_bounds("effects.fade", &self.fade)?;
        ensure!(
            self.horiz_trans.level.is_finite() && self.vert_trans.level.is_finite(),
            "effects pan levels must be finite"
        );
        Ok(())
    }
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            zoom: false,
            zoom_start: Self::default_zoom_start(),
            zoom_end: Self::default_zoom_end(),
            horiz_trans: HorizontalTrans::default(),
            vert_trans: VerticalTrans::default(),
            transition: DurationTiming::Timed(TimingDefaults::TRANSITION.constant_timing()),
            cross_fade: false,
            fade: DurationTiming::Timed(TimingDefaults::FADE.constant_timing()),
            easing: Easing::Linear,
        }
    }
}

const fn default_pan_level() -> f32 {
    10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HorizontalDirection {
    #[default]
    None,
    Left,
    Right,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerticalDirection {
    #[default]
    None,
    Up,
    Down,
    Random,
}

/// Horizontal pan as a percentage of the item's width.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HorizontalTrans {
    pub direction: HorizontalDirection,
    pub level: f32,
}

impl HorizontalTrans {
    /// Signed translation; left is negative.
    pub fn offset<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self.direction {
            HorizontalDirection::None => 0.0,
            HorizontalDirection::Left => -self.level,
            HorizontalDirection::Right => self.level,
            HorizontalDirection::Random => random_sign(rng) * self.level,
        }
    }
}

impl Default for HorizontalTrans {
    fn default() -> Self {
        Self {
            direction: HorizontalDirection::None,
            level: default_pan_level(),
        }
    }
}

/// Vertical pan as a percentage of the item's height.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VerticalTrans {
    pub direction: VerticalDirection,
    pub level: f32,
}

impl VerticalTrans {
    /// Signed translation; up is negative.
    pub fn offset<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self.direction {
            VerticalDirection::None => 0.0,
            VerticalDirection::Up => -self.level,
            VerticalDirection::Down => self.level,
            VerticalDirection::Random => random_sign(rng) * self.level,
        }
    }
}

impl Default for VerticalTrans {
    fn default() -> Self {
        Self {
            direction: VerticalDirection::None,
            level: default_pan_level(),
        }
    }
}

fn random_sign<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    if rng.random_bool(0.5) { 1.0 } else { -1.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundMode {
    None,
    Color,
    #[default]
    Blur,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BackgroundSettings {
    #[serde(rename = "type")]
    pub kind: BackgroundMode,
    #[serde(deserialize_with = "rgb_color")]
    pub color: [u8; 3],
    /// Blur radius for [`BackgroundMode::Blur`].
    pub blur: f32,
}

impl BackgroundSettings {
    const fn default_blur() -> f32 {
        8.0
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.blur.is_finite() && self.blur >= 0.0,
            "background.blur must be a non-negative number"
        );
        Ok(())
    }
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            kind: BackgroundMode::Blur,
            color: [0, 0, 0],
            blur: Self::default_blur(),
        }
    }
}

/// Transition settings resolved for one item. Two configs compare equal when
/// showing the same source under both would look identical.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionConfig {
    pub zoom_start: f32,
    pub zoom_end: f32,
    /// Signed pan in percent of the item's width.
    pub horiz_trans_level: f32,
    /// Signed pan in percent of the item's height.
    pub vert_trans_level: f32,
    pub trans_duration: Duration,
    pub cross_fade: bool,
    pub fade_duration: Duration,
    pub background: BackgroundMode,
    pub background_color: [u8; 3],
    pub background_blur: f32,
    pub video_volume: u8,
    pub easing: Easing,
}

impl TransitionConfig {
    /// Video volume as a gain in `0.0..=1.0`.
    pub fn volume_gain(&self) -> f32 {
        f32::from(self.video_volume.min(100)) / 100.0
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            zoom_start: 1.0,
            zoom_end: 1.0,
            horiz_trans_level: 0.0,
            vert_trans_level: 0.0,
            trans_duration: Duration::from_millis(TimingDefaults::TRANSITION.constant),
            cross_fade: false,
            fade_duration: Duration::from_millis(TimingDefaults::FADE.constant),
            background: BackgroundMode::Blur,
            background_color: [0, 0, 0],
            background_blur: BackgroundSettings::default_blur(),
            video_volume: 0,
            easing: Easing::Linear,
        }
    }
}

fn check_bounds(section: &str, timing: &DurationTiming) -> Result<()> {
    if let DurationTiming::Timed(timing) = timing
        && let Some((min, max)) = timing.bounds()
    {
        ensure!(
            min <= max,
            "{section}: min ({}ms) must not exceed max ({}ms)",
            min.as_millis(),
            max.as_millis()
        );
    }
    Ok(())
}

/// Defaults filled in for timing keys the scene file leaves out.
#[derive(Debug, Clone, Copy)]
struct TimingDefaults {
    constant: u64,
    min: u64,
    max: u64,
}

impl TimingDefaults {
    const SCENE: Self = Self {
        constant: 1000,
        min: 200,
        max: 1200,
    };
    const TRANSITION: Self = Self {
        constant: 5000,
        min: 1000,
        max: 7000,
    };
    const FADE: Self = Self {
        constant: 500,
        min: 100,
        max: 700,
    };

    const fn constant_timing(self) -> TimingConfig {
        TimingConfig::constant_millis(self.constant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimingFunction {
    Constant,
    Random,
    Sin,
    Scene,
    /// Legacy named presets, all sinusoidal with fixed bounds.
    Preset { min: u64, max: u64 },
}

impl TimingFunction {
    const NAMES: &'static [&'static str] = &[
        "constant",
        "random",
        "sin",
        "scene",
        "variable-faster",
        "variable-medium",
        "variable-slow",
        "variable-slower",
        "variable-slowest",
    ];

    fn parse(raw: &str) -> Option<Self> {
        Some(match raw.trim() {
            "constant" => Self::Constant,
            "random" | "at.random" => Self::Random,
            "sin" | "at.sin" => Self::Sin,
            "scene" => Self::Scene,
            "variable-faster" => Self::Preset { min: 0, max: 600 },
            "variable-medium" => Self::Preset {
                min: 3000,
                max: 5000,
            },
            "variable-slow" => Self::Preset {
                min: 3500,
                max: 6500,
            },
            "variable-slower" => Self::Preset {
                min: 10000,
                max: 20000,
            },
            "variable-slowest" => Self::Preset {
                min: 30000,
                max: 60000,
            },
            _ => return None,
        })
    }
}

/// A number as a hand-edited scene file may spell it: integer, float, or a
/// string with leading digits. Holds `None` when nothing numeric was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct LenientNumber(Option<u64>);

impl LenientNumber {
    fn millis_or_fallback(self) -> Duration {
        self.0.map(Duration::from_millis).unwrap_or(FALLBACK_INTERVAL)
    }
}

impl<'de> Deserialize<'de> for LenientNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LenientNumberVisitor)
    }
}

struct LenientNumberVisitor;

impl<'de> Visitor<'de> for LenientNumberVisitor {
    type Value = LenientNumber;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number of milliseconds")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(LenientNumber(Some(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(LenientNumber(Some(v.max(0) as u64)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if !v.is_finite() {
            return Ok(LenientNumber(None));
        }
        Ok(LenientNumber(Some(v.trunc().max(0.0) as u64)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(LenientNumber(coerce_millis(v)))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(LenientNumber(None))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(LenientNumber(None))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawTiming {
    function: Option<String>,
    constant: Option<LenientNumber>,
    min: Option<LenientNumber>,
    max: Option<LenientNumber>,
    sin_rate: Option<LenientNumber>,
    #[serde(with = "humantime_serde")]
    period: Option<Duration>,
}

impl RawTiming {
    fn resolve(self, defaults: TimingDefaults, allow_scene: bool) -> Result<DurationTiming, String> {
        let function = match self.function.as_deref() {
            None => TimingFunction::Constant,
            Some(name) => TimingFunction::parse(name).ok_or_else(|| {
                format!(
                    "unknown timing function `{name}`, expected one of {}",
                    TimingFunction::NAMES.join(", ")
                )
            })?,
        };
        let millis = |value: Option<LenientNumber>, default: u64| {
            value
                .unwrap_or(LenientNumber(Some(default)))
                .millis_or_fallback()
        };
        let period = |rate: Option<LenientNumber>| {
            self.period.unwrap_or_else(|| {
                let rate = rate
                    .and_then(|r| r.0)
                    .unwrap_or(u64::from(MAX_SIN_RATE))
                    .min(u64::from(u32::MAX)) as u32;
                period_for_rate(rate)
            })
        };
        let timing = match function {
            TimingFunction::Scene if allow_scene => return Ok(DurationTiming::Scene),
            TimingFunction::Scene => {
                return Err("`scene` timing is only valid for transition and fade".to_string());
            }
            TimingFunction::Constant => TimingConfig::Constant {
                interval: millis(self.constant, defaults.constant),
            },
            TimingFunction::Random => TimingConfig::Random {
                min: millis(self.min, defaults.min),
                max: millis(self.max, defaults.max),
            },
            TimingFunction::Sin => TimingConfig::Sin {
                min: millis(self.min, defaults.min),
                max: millis(self.max, defaults.max),
                period: period(self.sin_rate),
            },
            TimingFunction::Preset { min, max } => TimingConfig::Sin {
                min: Duration::from_millis(min),
                max: Duration::from_millis(max),
                period: period(self.sin_rate),
            },
        };
        Ok(DurationTiming::Timed(timing))
    }
}

fn scene_timing<'de, D>(deserializer: D) -> Result<TimingConfig, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTiming::deserialize(deserializer)?
        .resolve(TimingDefaults::SCENE, false)
        .map_err(de::Error::custom)?
    {
        DurationTiming::Timed(timing) => Ok(timing),
        DurationTiming::Scene => Err(de::Error::custom("`scene` is not a scene timing")),
    }
}

/// The `effects` section as written, including keys older scene files use.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawEffects {
    zoom: Option<bool>,
    zoom_start: Option<f32>,
    zoom_end: Option<f32>,
    horiz_trans: Option<HorizontalTrans>,
    vert_trans: Option<VerticalTrans>,
    transition: Option<RawTiming>,
    cross_fade: Option<bool>,
    fade: Option<RawTiming>,
    easing: Option<Easing>,
    /// Legacy: transition lasts the whole scene.
    trans_full: bool,
    /// Legacy: fade lasts the whole scene.
    fade_full: bool,
    /// Legacy: transition length in seconds when `transition` is absent.
    effect_level: Option<LenientNumber>,
}

impl TryFrom<RawEffects> for EffectSettings {
    type Error = String;

    fn try_from(raw: RawEffects) -> Result<Self, Self::Error> {
        let defaults = EffectSettings::default();
        let transition = if raw.trans_full {
            DurationTiming::Scene
        } else if let Some(timing) = raw.transition {
            timing.resolve(TimingDefaults::TRANSITION, true)?
        } else {
            match raw.effect_level.and_then(|level| level.0) {
                Some(secs) if secs > 0 => {
                    DurationTiming::Timed(TimingConfig::constant_millis(secs.saturating_mul(1000)))
                }
                _ => defaults.transition,
            }
        };
        let fade = if raw.fade_full {
            DurationTiming::Scene
        } else if let Some(timing) = raw.fade {
            timing.resolve(TimingDefaults::FADE, true)?
        } else {
            defaults.fade
        };
        Ok(Self {
            zoom: raw.zoom.unwrap_or(defaults.zoom),
            zoom_start: raw.zoom_start.unwrap_or(defaults.zoom_start),
            zoom_end: raw.zoom_end.unwrap_or(defaults.zoom_end),
            horiz_trans: raw.horiz_trans.unwrap_or(defaults.horiz_trans),
            vert_trans: raw.vert_trans.unwrap_or(defaults.vert_trans),
            transition,
            cross_fade: raw.cross_fade.unwrap_or(defaults.cross_fade),
            fade,
            easing: raw.easing.unwrap_or(defaults.easing),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColor {
    Rgb([u8; 3]),
    Hex(String),
}

fn rgb_color<'de, D>(deserializer: D) -> Result<[u8; 3], D::Error>
where
    D: Deserializer<'de>,
{
    match RawColor::deserialize(deserializer)? {
        RawColor::Rgb(rgb) => Ok(rgb),
        RawColor::Hex(raw) => parse_hex_color(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid color `{raw}`, expected #rrggbb"))),
    }
}

/// `#rrggbb` or `#rgb`, the leading `#` optional.
pub fn parse_hex_color(raw: &str) -> Option<[u8; 3]> {
    let hex = raw.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some([channel(0)?, channel(2)?, channel(4)?])
        }
        3 => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some([channel(0)?, channel(1)?, channel(2)?])
        }
        _ => None,
    }
}
