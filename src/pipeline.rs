use std::path::Path;

use image::RgbaImage;

use crate::config::Config;
use crate::error::{VerticutError, VerticutResult};
use crate::executor::{CancelToken, JobExecutor, JobResult, TranscodeJob};
use crate::geometry::{GeometryDescriptor, ReframeParams};
use crate::preview::{extract_frame, preview_instant, render_preview};
use crate::probe::probe_source;

/// Render the still preview for one source.
///
/// Probes the source, computes the shared geometry, pulls one frame and
/// composites it. The framing in the returned image is exactly what
/// [`convert`] will produce for the same parameters.
pub fn preview_still(
    input: &Path,
    params: ReframeParams,
    cfg: &Config,
) -> VerticutResult<RgbaImage> {
    preview_still_at(input, params, cfg, None)
}

/// [`preview_still`] with an explicit frame-grab instant in seconds.
pub fn preview_still_at(
    input: &Path,
    params: ReframeParams,
    cfg: &Config,
    at_seconds: Option<f64>,
) -> VerticutResult<RgbaImage> {
    let info = probe_source(input)?;
    let geo = GeometryDescriptor::compute(info.dims, params, cfg)?;
    let at = at_seconds.unwrap_or_else(|| preview_instant(info.dims.duration_seconds));
    let frame = extract_frame(&info, at)?;
    render_preview(&frame, &geo)
}

/// Transcode one source to the vertical canvas.
///
/// Returns the terminal [`JobResult`]; callers that want failure as an error
/// chain should follow with [`JobResult::ensure_success`].
pub fn convert(
    input: &Path,
    output: &Path,
    params: ReframeParams,
    cfg: &Config,
) -> VerticutResult<JobResult> {
    convert_with_cancel(input, output, params, cfg, None)
}

#[tracing::instrument(skip_all, fields(input = %input.display()))]
pub fn convert_with_cancel(
    input: &Path,
    output: &Path,
    params: ReframeParams,
    cfg: &Config,
    cancel: Option<&CancelToken>,
) -> VerticutResult<JobResult> {
    let info = probe_source(input)?;
    if info.dims.duration_seconds > cfg.max_duration_seconds {
        return Err(VerticutError::invalid_params(format!(
            "source runs {:.1}s, limit is {:.0}s",
            info.dims.duration_seconds, cfg.max_duration_seconds
        )));
    }

    let geo = GeometryDescriptor::compute(info.dims, params, cfg)?;
    let job = TranscodeJob::new(input, output, geo, cfg, info.has_audio);
    tracing::info!(job = %job.id, w = info.dims.width, h = info.dims.height, "starting transcode");
    JobExecutor::from_config(cfg).run_with_cancel(&job, cancel)
}
