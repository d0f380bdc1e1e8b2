//! Contain/cover placement of a media item inside the viewport.

use serde::Deserialize;

/// Size of the rendering surface in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Substitute `window` when this surface has not been sized yet.
    pub const fn or_window(self, window: ViewportSize) -> ViewportSize {
        if self.is_empty() { window } else { self }
    }
}

/// Native pixel dimensions of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrinsicSize {
    pub width: u32,
    pub height: u32,
}

impl IntrinsicSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn as_f32(self) -> (f32, f32) {
        (self.width.max(1) as f32, self.height.max(1) as f32)
    }
}

/// Which viewport axis the placed element spans completely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillAxis {
    /// `height: 100%`, width follows the aspect ratio.
    Height,
    /// `width: 100%`, height follows the aspect ratio.
    Width,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub margin_top: f32,
    pub margin_left: f32,
    pub width: f32,
    pub height: f32,
    pub fill: FillAxis,
}

impl Placement {
    /// `(x, y, w, h)` of the element relative to the viewport origin.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (self.margin_left, self.margin_top, self.width, self.height)
    }

    fn spanning(fill: FillAxis, viewport: ViewportSize, intrinsic: IntrinsicSize) -> Self {
        let (iw, ih) = intrinsic.as_f32();
        let vw = viewport.width as f32;
        let vh = viewport.height as f32;
        match fill {
            FillAxis::Height => {
                let scale = vh / ih;
                Self {
                    scale,
                    margin_top: 0.0,
                    margin_left: vw / 2.0 - iw * scale / 2.0,
                    width: iw * scale,
                    height: vh,
                    fill,
                }
            }
            FillAxis::Width => {
                let scale = vw / iw;
                Self {
                    scale,
                    margin_top: vh / 2.0 - ih * scale / 2.0,
                    margin_left: 0.0,
                    width: vw,
                    height: ih * scale,
                    fill,
                }
            }
        }
    }
}

/// Geometry for one item: the contained foreground and, in blur mode, the
/// covering backdrop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutResult {
    pub viewport: ViewportSize,
    pub foreground: Placement,
    pub backdrop: Option<Placement>,
}

fn contain_axis(viewport: ViewportSize, intrinsic: IntrinsicSize) -> FillAxis {
    let (iw, ih) = intrinsic.as_f32();
    let parent_aspect = viewport.width as f32 / viewport.height as f32;
    let source_aspect = iw / ih;
    if source_aspect < parent_aspect {
        FillAxis::Height
    } else {
        FillAxis::Width
    }
}

const fn opposite(axis: FillAxis) -> FillAxis {
    match axis {
        FillAxis::Height => FillAxis::Width,
        FillAxis::Width => FillAxis::Height,
    }
}

/// Largest placement that fits entirely inside `viewport`, centered on the
/// remaining axis.
pub fn contain(viewport: ViewportSize, intrinsic: IntrinsicSize) -> Placement {
    Placement::spanning(contain_axis(viewport, intrinsic), viewport, intrinsic)
}

/// Smallest placement that covers all of `viewport`; overflow is centered
/// and cropped by the host.
pub fn cover(viewport: ViewportSize, intrinsic: IntrinsicSize) -> Placement {
    Placement::spanning(
        opposite(contain_axis(viewport, intrinsic)),
        viewport,
        intrinsic,
    )
}

/// Contain-fit the foreground only.
///
/// Callers resolve empty viewports with [`ViewportSize::or_window`] first; an
/// empty viewport here is treated as 1x1 so the result stays finite.
pub fn fit(viewport: ViewportSize, intrinsic: IntrinsicSize) -> LayoutResult {
    let viewport = ViewportSize::new(viewport.width.max(1), viewport.height.max(1));
    LayoutResult {
        viewport,
        foreground: contain(viewport, intrinsic),
        backdrop: None,
    }
}

/// Contain-fit the foreground and cover-fit a backdrop behind it.
pub fn fit_with_backdrop(viewport: ViewportSize, intrinsic: IntrinsicSize) -> LayoutResult {
    let mut result = fit(viewport, intrinsic);
    result.backdrop = Some(cover(result.viewport, intrinsic));
    result
}
