//! Media handles consumed by the engine.
//!
//! Acquisition and decoding happen outside the engine; it only sees sized,
//! ready-to-draw sources behind [`MediaSource`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;

use crate::error::Error;
use crate::processing::layout::IntrinsicSize;

/// Identity of a logical item, stable across re-selection of the same item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaKey(Arc<str>);

impl MediaKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Still,
    AnimatedStill,
    Video,
}

impl MediaKind {
    /// Classify by extension. Anything unrecognised plays as a still.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("gif") => Self::AnimatedStill,
            Some("mp4" | "m4v" | "webm" | "mkv" | "mov" | "ogv") => Self::Video,
            _ => Self::Still,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Loaded but not started (waiting on autoplay or the user).
    Pending,
    Playing,
    Paused,
    Ended,
}

/// Transport controls of a live video source.
pub trait VideoTransport: Send + Sync {
    fn status(&self) -> PlaybackStatus;
    /// Request playback; the source reports `Playing` once it actually starts.
    fn play(&self);
    /// Volume in `0.0..=1.0`.
    fn set_volume(&self, volume: f32);
    fn volume(&self) -> f32;
}

pub trait MediaSource: Send + Sync {
    /// Stable identity of the underlying source (path, URL).
    fn source_id(&self) -> &str;
    fn kind(&self) -> MediaKind;
    fn intrinsic_size(&self) -> IntrinsicSize;
    /// The currently visible frame, if the source can provide one.
    fn frame(&self) -> Option<Arc<RgbaImage>>;
    fn transport(&self) -> Option<&dyn VideoTransport> {
        None
    }
}

/// One playable item: identity key plus the source handle.
#[derive(Clone)]
pub struct MediaItem {
    key: MediaKey,
    source: Arc<dyn MediaSource>,
}

impl MediaItem {
    pub fn new(key: impl Into<MediaKey>, source: Arc<dyn MediaSource>) -> Self {
        Self {
            key: key.into(),
            source,
        }
    }

    pub fn key(&self) -> &MediaKey {
        &self.key
    }

    pub fn source(&self) -> &Arc<dyn MediaSource> {
        &self.source
    }

    pub fn source_id(&self) -> &str {
        self.source.source_id()
    }

    pub fn intrinsic_size(&self) -> IntrinsicSize {
        self.source.intrinsic_size()
    }

    /// A video without transport controls cannot be driven and plays as a
    /// still.
    pub fn kind(&self) -> MediaKind {
        match self.source.kind() {
            MediaKind::Video if self.source.transport().is_none() => MediaKind::Still,
            kind => kind,
        }
    }

    pub fn transport(&self) -> Option<&dyn VideoTransport> {
        match self.source.kind() {
            MediaKind::Video => self.source.transport(),
            _ => None,
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind() == MediaKind::Video
    }
}

impl fmt::Debug for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaItem")
            .field("key", &self.key)
            .field("source", &self.source_id())
            .field("kind", &self.kind())
            .finish()
    }
}

/// A decoded image. GIFs keep their first frame and report
/// [`MediaKind::AnimatedStill`].
pub struct StillImage {
    id: String,
    kind: MediaKind,
    image: Arc<RgbaImage>,
}

impl StillImage {
    pub fn new(id: impl Into<String>, kind: MediaKind, image: RgbaImage) -> Self {
        let kind = match kind {
            MediaKind::Video => MediaKind::Still,
            other => other,
        };
        Self {
            id: id.into(),
            kind,
            image: Arc::new(image),
        }
    }

    pub fn open(path: &Path) -> Result<Self, Error> {
        let image = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|source| Error::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        Ok(Self::new(
            path.to_string_lossy(),
            MediaKind::from_path(path),
            image,
        ))
    }

    /// Wrap as an item keyed by its source id.
    pub fn into_item(self) -> MediaItem {
        let key = MediaKey::new(self.id.as_str());
        MediaItem::new(key, Arc::new(self))
    }
}

impl MediaSource for StillImage {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn intrinsic_size(&self) -> IntrinsicSize {
        IntrinsicSize::new(self.image.width(), self.image.height())
    }

    fn frame(&self) -> Option<Arc<RgbaImage>> {
        Some(Arc::clone(&self.image))
    }
}

/// Scriptable sources for exercising the engine without a decoder.
#[doc(hidden)]
pub mod testkit {
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use image::{Rgba, RgbaImage};

    use super::{MediaItem, MediaKind, MediaSource, PlaybackStatus, StillImage, VideoTransport};
    use crate::processing::layout::IntrinsicSize;

    pub fn solid_still(id: &str, width: u32, height: u32) -> MediaItem {
        let image = RgbaImage::from_pixel(width, height, Rgba([90, 120, 150, 255]));
        StillImage::new(id, MediaKind::from_path(Path::new(id)), image).into_item()
    }

    /// A video whose transport state is driven by the test.
    pub struct ScriptedVideo {
        id: String,
        size: IntrinsicSize,
        status: Mutex<PlaybackStatus>,
        volume: Mutex<f32>,
        autoplay: bool,
        play_requests: AtomicU64,
        frames_served: AtomicU64,
    }

    impl ScriptedVideo {
        /// `autoplay` sources switch to `Playing` as soon as `play` is called.
        pub fn new(id: &str, width: u32, height: u32, autoplay: bool) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                size: IntrinsicSize::new(width, height),
                status: Mutex::new(PlaybackStatus::Pending),
                volume: Mutex::new(1.0),
                autoplay,
                play_requests: AtomicU64::new(0),
                frames_served: AtomicU64::new(0),
            })
        }

        pub fn set_status(&self, status: PlaybackStatus) {
            *self.status.lock().expect("scripted video status poisoned") = status;
        }

        pub fn play_requests(&self) -> u64 {
            self.play_requests.load(Ordering::SeqCst)
        }

        pub fn frames_served(&self) -> u64 {
            self.frames_served.load(Ordering::SeqCst)
        }

        pub fn item(self: &Arc<Self>, key: &str) -> MediaItem {
            MediaItem::new(key, Arc::clone(self) as Arc<dyn MediaSource>)
        }
    }

    impl MediaSource for ScriptedVideo {
        fn source_id(&self) -> &str {
            &self.id
        }

        fn kind(&self) -> MediaKind {
            MediaKind::Video
        }

        fn intrinsic_size(&self) -> IntrinsicSize {
            self.size
        }

        fn frame(&self) -> Option<Arc<RgbaImage>> {
            let n = self.frames_served.fetch_add(1, Ordering::SeqCst);
            let shade = (n % 255) as u8;
            Some(Arc::new(RgbaImage::from_pixel(
                self.size.width.clamp(1, 64),
                self.size.height.clamp(1, 64),
                Rgba([shade, shade, shade, 255]),
            )))
        }

        fn transport(&self) -> Option<&dyn VideoTransport> {
            Some(self)
        }
    }

    impl VideoTransport for ScriptedVideo {
        fn status(&self) -> PlaybackStatus {
            *self.status.lock().expect("scripted video status poisoned")
        }

        fn play(&self) {
            self.play_requests.fetch_add(1, Ordering::SeqCst);
            if self.autoplay {
                self.set_status(PlaybackStatus::Playing);
            }
        }

        fn set_volume(&self, volume: f32) {
            *self.volume.lock().expect("scripted video volume poisoned") = volume;
        }

        fn volume(&self) -> f32 {
            *self.volume.lock().expect("scripted video volume poisoned")
        }
    }
}
