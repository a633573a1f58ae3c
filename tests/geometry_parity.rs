//! Cross-backend consistency: the still preview and the transcode directive
//! must agree on crop, scale, and placement for any descriptor. Both consume
//! the same `GeometryDescriptor`, so this guards against either backend
//! growing its own formulas again.

use verticut::{
    CANVAS_HEIGHT, CANVAS_WIDTH, Config, DirectiveOpts, GeometryDescriptor, ReframeParams,
    SourceDimensions, TranscodeDirective,
};

const REL_TOLERANCE: f64 = 1e-6;

fn rel_eq(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= REL_TOLERANCE * scale
}

fn sweep() -> Vec<(SourceDimensions, ReframeParams)> {
    let mut cases = Vec::new();
    for (w, h) in [
        (1920u32, 1080u32),
        (1280, 720),
        (3840, 2160),
        (640, 480),
        (1080, 1920),
        (2560, 1080),
        (720, 576),
    ] {
        for crop in [0.0, 0.05, 0.09, 0.17, 0.25] {
            for zoom in [1.0, 1.05, 1.3, 1.5, 2.0] {
                cases.push((
                    SourceDimensions {
                        width: w,
                        height: h,
                        duration_seconds: 30.0,
                    },
                    ReframeParams {
                        crop_percent: crop,
                        zoom_level: zoom,
                    },
                ));
            }
        }
    }
    cases
}

#[test]
fn preview_and_directive_share_crop_scale_and_placement() {
    let cfg = Config::default();
    for (dims, params) in sweep() {
        let geo = GeometryDescriptor::compute(dims, params, &cfg).unwrap();
        let directive = TranscodeDirective::build(&geo, DirectiveOpts::from_config(&cfg, true));

        // Crop fractions: preview works in pixels of the probed frame, the
        // directive in fractions of input height. Same quantity.
        let preview_top = f64::from(geo.crop_top_px) / f64::from(dims.height);
        let preview_kept = f64::from(geo.cropped_height) / f64::from(dims.height);
        assert!(
            rel_eq(preview_top, directive.effective_crop_top_fraction()),
            "top crop drifted for {dims:?} {params:?}"
        );
        assert!(
            rel_eq(preview_kept, directive.effective_kept_height_fraction()),
            "kept height drifted for {dims:?} {params:?}"
        );

        // Scale: preview resizes the foreground to fg_width; the directive
        // scales to the same width.
        let preview_scale = f64::from(geo.fg_width) / f64::from(CANVAS_WIDTH);
        assert!(
            rel_eq(preview_scale, directive.effective_scale_factor()),
            "scale drifted for {dims:?} {params:?}"
        );

        // Placement: the directive's centered overlay evaluates to the
        // descriptor's paste offsets.
        assert_eq!(directive.effective_paste(), (geo.paste_x, geo.paste_y));
    }
}

#[test]
fn crop_fractions_partition_the_input_height() {
    let cfg = Config::default();
    for (dims, params) in sweep() {
        let geo = GeometryDescriptor::compute(dims, params, &cfg).unwrap();
        let total = 2.0 * geo.crop_top_fraction() + geo.kept_height_fraction();
        assert!(rel_eq(total, 1.0), "fractions do not partition for {dims:?}");
        assert!(geo.cropped_height > 0);
    }
}

#[test]
fn visible_region_always_lies_inside_the_canvas() {
    let cfg = Config::default();
    for (dims, params) in sweep() {
        let geo = GeometryDescriptor::compute(dims, params, &cfg).unwrap();
        // The overlay may overhang; the visible intersection must not.
        let x0 = geo.paste_x.max(0);
        let y0 = geo.paste_y.max(0);
        let x1 = (geo.paste_x + i64::from(geo.fg_width)).min(i64::from(CANVAS_WIDTH));
        let y1 = (geo.paste_y + i64::from(geo.fg_height)).min(i64::from(CANVAS_HEIGHT));
        assert!(x0 >= 0 && y0 >= 0);
        assert!(x1 <= i64::from(CANVAS_WIDTH));
        assert!(y1 <= i64::from(CANVAS_HEIGHT));
        assert!(x1 > x0, "foreground never intersects canvas for {dims:?}");
    }
}
