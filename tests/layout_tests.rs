use rust_slideshow::processing::layout::{
    FillAxis, IntrinsicSize, ViewportSize, fit, fit_with_backdrop,
};

const EPS: f32 = 1e-2;

fn sizes() -> Vec<(u32, u32)> {
    vec![
        (1, 1),
        (3, 2),
        (640, 480),
        (800, 600),
        (1080, 1920),
        (1920, 1080),
        (3000, 1000),
        (1000, 3000),
        (4032, 3024),
    ]
}

#[test]
fn hd_viewport_pillarboxes_four_three_source() {
    let layout = fit(ViewportSize::new(1920, 1080), IntrinsicSize::new(800, 600));
    let fg = layout.foreground;
    assert!((fg.scale - 1.8).abs() < 1e-4);
    assert!((fg.margin_left - 240.0).abs() < 1e-3);
    assert_eq!(fg.margin_top, 0.0);
}

#[test]
fn foreground_stays_inside_and_touches_an_edge_pair() {
    for (vw, vh) in sizes() {
        for (iw, ih) in sizes() {
            let viewport = ViewportSize::new(vw, vh);
            let fg = fit(viewport, IntrinsicSize::new(iw, ih)).foreground;
            let (x, y, w, h) = fg.bounds();
            let (vw, vh) = (vw as f32, vh as f32);
            assert!(x >= -EPS && y >= -EPS, "{vw}x{vh} / {iw}x{ih}: origin {x},{y}");
            assert!(x + w <= vw + EPS, "{vw}x{vh} / {iw}x{ih}: right edge {}", x + w);
            assert!(y + h <= vh + EPS, "{vw}x{vh} / {iw}x{ih}: bottom edge {}", y + h);
            match fg.fill {
                FillAxis::Height => assert!((h - vh).abs() < EPS && y.abs() < EPS),
                FillAxis::Width => assert!((w - vw).abs() < EPS && x.abs() < EPS),
            }
            // Centered on the free axis.
            assert!(((x + w / 2.0) - vw / 2.0).abs() < EPS);
            assert!(((y + h / 2.0) - vh / 2.0).abs() < EPS);
        }
    }
}

#[test]
fn aspect_ratio_is_preserved() {
    for (iw, ih) in sizes() {
        let fg = fit(ViewportSize::new(1280, 720), IntrinsicSize::new(iw, ih)).foreground;
        let expected = iw as f32 / ih as f32;
        let actual = fg.width / fg.height;
        assert!((actual - expected).abs() / expected < 1e-3);
    }
}

#[test]
fn backdrop_covers_whole_viewport() {
    for (vw, vh) in sizes() {
        for (iw, ih) in sizes() {
            let layout = fit_with_backdrop(ViewportSize::new(vw, vh), IntrinsicSize::new(iw, ih));
            let bg = layout.backdrop.expect("backdrop geometry");
            let (x, y, w, h) = bg.bounds();
            assert!(x <= EPS && y <= EPS);
            assert!(x + w >= vw as f32 - EPS);
            assert!(y + h >= vh as f32 - EPS);
            assert_ne!(bg.fill, layout.foreground.fill);
        }
    }
}

#[test]
fn equal_aspect_fills_both_axes() {
    let fg = fit(ViewportSize::new(1600, 1200), IntrinsicSize::new(800, 600)).foreground;
    assert_eq!(fg.fill, FillAxis::Width);
    assert!((fg.width - 1600.0).abs() < EPS);
    assert!((fg.height - 1200.0).abs() < EPS);
}
