use crate::error::{VerticutError, VerticutResult};

/// Encoder speed/quality tradeoff for the transcode path.
///
/// The preset/CRF pairs span the deployment range: `Fast` suits tightly
/// time-boxed environments, `Best` an unconstrained one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeQuality {
    #[default]
    Fast,
    Balanced,
    Best,
}

impl EncodeQuality {
    pub fn preset(self) -> &'static str {
        match self {
            EncodeQuality::Fast => "ultrafast",
            EncodeQuality::Balanced => "faster",
            EncodeQuality::Best => "medium",
        }
    }

    pub fn crf(self) -> u32 {
        match self {
            EncodeQuality::Fast => 28,
            EncodeQuality::Balanced => 26,
            EncodeQuality::Best => 23,
        }
    }
}

/// Tunables consumed by the reframe pipeline.
///
/// The canvas itself is fixed at 1080x1920 by contract and is not
/// configurable; see [`crate::geometry::CANVAS_WIDTH`].
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Upper bound accepted for `ReframeParams::crop_percent`.
    pub max_crop_percent: f64,
    /// Inclusive bounds accepted for `ReframeParams::zoom_level`.
    pub zoom_min: f64,
    pub zoom_max: f64,
    /// Blur strength for the background layer, in pixels. Used as the
    /// Gaussian sigma by the preview renderer and as the boxblur radius by
    /// the transcode directive.
    pub blur_radius: u32,
    /// Boxblur pass count in the transcode directive.
    pub blur_passes: u32,
    /// Hard wall-clock bound on one transcode job.
    pub job_timeout_seconds: u64,
    /// Cap on the transcoder's internal thread usage. A resource-sharing
    /// policy for constrained deployments, not a correctness requirement.
    pub thread_cap: u32,
    /// Output duration cap passed to the transcoder (`-t`).
    pub output_duration_cap_seconds: f64,
    /// Sources longer than this are rejected before transcoding.
    pub max_duration_seconds: f64,
    pub quality: EncodeQuality,
    pub audio_bitrate_kbps: u32,
    /// Upper bound on transcoder diagnostic text retained and surfaced.
    pub max_diagnostic_bytes: usize,
    /// Fragment size the ingress transport is expected to use. Informational
    /// only; the assembler places no bound on individual fragment size.
    pub fragment_chunk_size_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_crop_percent: 0.25,
            zoom_min: 1.0,
            zoom_max: 2.0,
            blur_radius: 20,
            blur_passes: 3,
            job_timeout_seconds: 240,
            thread_cap: 4,
            output_duration_cap_seconds: 300.0,
            max_duration_seconds: 300.0,
            quality: EncodeQuality::Fast,
            audio_bitrate_kbps: 96,
            max_diagnostic_bytes: 400,
            fragment_chunk_size_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Reject configurations that would make every request fail.
    pub fn validate(&self) -> VerticutResult<()> {
        if !(0.0..0.5).contains(&self.max_crop_percent) {
            return Err(VerticutError::invalid_params(
                "max_crop_percent must lie in [0, 0.5)",
            ));
        }
        if self.zoom_min <= 0.0 || self.zoom_max < self.zoom_min {
            return Err(VerticutError::invalid_params(
                "zoom bounds must satisfy 0 < zoom_min <= zoom_max",
            ));
        }
        if self.job_timeout_seconds == 0 {
            return Err(VerticutError::invalid_params(
                "job_timeout_seconds must be non-zero",
            ));
        }
        if self.output_duration_cap_seconds <= 0.0 {
            return Err(VerticutError::invalid_params(
                "output_duration_cap_seconds must be positive",
            ));
        }
        Ok(())
    }
}
