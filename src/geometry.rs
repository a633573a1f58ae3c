use crate::config::Config;
use crate::error::{VerticutError, VerticutResult};

/// Output canvas width in pixels, fixed by contract.
pub const CANVAS_WIDTH: u32 = 1080;
/// Output canvas height in pixels, fixed by contract.
pub const CANVAS_HEIGHT: u32 = 1920;

/// Source video dimensions as reported by the prober.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Container/stream duration in seconds.
    pub duration_seconds: f64,
}

/// User-chosen reframe parameters for one request.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReframeParams {
    /// Fraction of source height cropped from the top and again from the
    /// bottom (symmetric letterbox removal).
    pub crop_percent: f64,
    /// Foreground scale relative to the canvas width; 1.0 fills the width.
    pub zoom_level: f64,
}

impl Default for ReframeParams {
    fn default() -> Self {
        Self {
            crop_percent: 0.09,
            zoom_level: 1.0,
        }
    }
}

/// The deterministic numeric output of the reframe computation.
///
/// Both rendering backends consume this descriptor as-is; neither recomputes
/// crop, scale, or placement on its own. That is what keeps the still preview
/// and the transcoded video in pixel agreement on framing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryDescriptor {
    /// The dimensions this descriptor was computed from.
    pub source: SourceDimensions,
    /// Rows cropped from the top of the source.
    pub crop_top_px: u32,
    /// Rows cropped from the bottom of the source.
    pub crop_bottom_px: u32,
    /// Source height remaining after the symmetric crop. Always > 0.
    pub cropped_height: u32,
    /// Aspect ratio of the cropped content, `width / cropped_height`.
    pub cropped_aspect: f64,
    /// Foreground layer width after zoom.
    pub fg_width: u32,
    /// Foreground layer height, aspect-preserving.
    pub fg_height: u32,
    /// Horizontal placement of the foreground on the canvas. Negative when
    /// the foreground overhangs; the overhang is clipped, never an error.
    pub paste_x: i64,
    /// Vertical placement of the foreground on the canvas.
    pub paste_y: i64,
    /// Background blur strength, copied from configuration.
    pub blur_radius: u32,
}

impl GeometryDescriptor {
    /// Compute the descriptor for one request.
    ///
    /// Pure and deterministic: identical inputs always produce an identical
    /// descriptor. Parameter ranges are checked before any geometry, so an
    /// out-of-range crop is an [`VerticutError::InvalidParams`] even when it
    /// would also have degenerated the crop.
    pub fn compute(
        dims: SourceDimensions,
        params: ReframeParams,
        cfg: &Config,
    ) -> VerticutResult<Self> {
        if dims.width == 0 || dims.height == 0 {
            return Err(VerticutError::invalid_params(
                "source dimensions must be non-zero",
            ));
        }
        if !params.crop_percent.is_finite()
            || params.crop_percent < 0.0
            || params.crop_percent > cfg.max_crop_percent
        {
            return Err(VerticutError::invalid_params(format!(
                "crop_percent {} outside [0, {}]",
                params.crop_percent, cfg.max_crop_percent
            )));
        }
        if !params.zoom_level.is_finite()
            || params.zoom_level < cfg.zoom_min
            || params.zoom_level > cfg.zoom_max
        {
            return Err(VerticutError::invalid_params(format!(
                "zoom_level {} outside [{}, {}]",
                params.zoom_level, cfg.zoom_min, cfg.zoom_max
            )));
        }

        let crop_px = (f64::from(dims.height) * params.crop_percent).round() as u32;
        let cropped = i64::from(dims.height) - 2 * i64::from(crop_px);
        if cropped <= 0 {
            return Err(VerticutError::DegenerateCrop {
                cropped_height: cropped,
            });
        }
        let cropped_height = cropped as u32;
        let cropped_aspect = f64::from(dims.width) / f64::from(cropped_height);

        let fg_width = (f64::from(CANVAS_WIDTH) * params.zoom_level).round() as u32;
        let fg_height = (f64::from(fg_width) / cropped_aspect).round() as u32;

        Ok(Self {
            source: dims,
            crop_top_px: crop_px,
            crop_bottom_px: crop_px,
            cropped_height,
            cropped_aspect,
            fg_width,
            fg_height,
            paste_x: (i64::from(CANVAS_WIDTH) - i64::from(fg_width)) / 2,
            paste_y: (i64::from(CANVAS_HEIGHT) - i64::from(fg_height)) / 2,
            blur_radius: cfg.blur_radius,
        })
    }

    /// Top crop as a fraction of the original input height.
    ///
    /// The transcode directive works in fractions because ffmpeg evaluates
    /// the crop against the unscaled input, not a pre-cropped raster.
    pub fn crop_top_fraction(&self) -> f64 {
        f64::from(self.crop_top_px) / f64::from(self.source.height)
    }

    /// Height kept after the symmetric crop, as a fraction of input height.
    pub fn kept_height_fraction(&self) -> f64 {
        f64::from(self.cropped_height) / f64::from(self.source.height)
    }

    /// Foreground scale relative to the canvas width.
    pub fn scale_factor(&self) -> f64 {
        f64::from(self.fg_width) / f64::from(CANVAS_WIDTH)
    }
}
