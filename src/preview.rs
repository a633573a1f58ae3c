use image::{RgbaImage, imageops};

use crate::error::{VerticutError, VerticutResult};
use crate::geometry::{CANVAS_HEIGHT, CANVAS_WIDTH, GeometryDescriptor};
use crate::probe::SourceInfo;

/// Pick the frame-grab instant for a preview: one second in, pulled back to
/// the middle for clips shorter than two seconds.
pub fn preview_instant(duration_seconds: f64) -> f64 {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return 0.0;
    }
    if duration_seconds >= 2.0 {
        1.0
    } else {
        duration_seconds / 2.0
    }
}

/// Decode a single RGBA frame at `at_seconds` through `ffmpeg`.
///
/// Frames are streamed as rawvideo over a pipe against the probed dimensions,
/// so no intermediate file is written.
pub fn extract_frame(info: &SourceInfo, at_seconds: f64) -> VerticutResult<RgbaImage> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{at_seconds:.3}")])
        .arg("-i")
        .arg(&info.path)
        .args([
            "-frames:v",
            "1",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            VerticutError::unreadable_source(format!("failed to run ffmpeg for frame extract: {e}"))
        })?;
    if !out.status.success() {
        return Err(VerticutError::unreadable_source(format!(
            "ffmpeg frame extract failed for '{}': {}",
            info.path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let (w, h) = (info.dims.width, info.dims.height);
    let expected_len = w as usize * h as usize * 4;
    if out.stdout.len() < expected_len {
        return Err(VerticutError::unreadable_source(format!(
            "ffmpeg returned {} bytes for a {}x{} frame (expected {expected_len})",
            out.stdout.len(),
            w,
            h
        )));
    }

    let mut bytes = out.stdout;
    bytes.truncate(expected_len);
    RgbaImage::from_raw(w, h, bytes)
        .ok_or_else(|| VerticutError::render("extracted frame buffer did not match dimensions"))
}

/// Composite one still frame onto the vertical canvas.
///
/// Steps mirror the transcode directive exactly: symmetric vertical crop,
/// blurred non-aspect stretch for the background, aspect-preserving zoomed
/// foreground, centered overlay with overhang clipped at the canvas edge.
/// Source alpha is honored during the overlay.
pub fn render_preview(frame: &RgbaImage, geo: &GeometryDescriptor) -> VerticutResult<RgbaImage> {
    let (w, h) = frame.dimensions();
    let crop_span = geo.crop_top_px as u64 + geo.cropped_height as u64;
    if w == 0 || geo.cropped_height == 0 || crop_span > u64::from(h) {
        return Err(VerticutError::render(format!(
            "crop [{}..{}) does not fit a {}x{} frame",
            geo.crop_top_px, crop_span, w, h
        )));
    }
    if geo.fg_width == 0 || geo.fg_height == 0 {
        return Err(VerticutError::render(format!(
            "foreground resize target {}x{} has zero area",
            geo.fg_width, geo.fg_height
        )));
    }

    let cropped = imageops::crop_imm(frame, 0, geo.crop_top_px, w, geo.cropped_height).to_image();

    let stretched = imageops::resize(
        &cropped,
        CANVAS_WIDTH,
        CANVAS_HEIGHT,
        imageops::FilterType::Lanczos3,
    );
    let mut canvas = imageops::fast_blur(&stretched, geo.blur_radius as f32);

    let foreground = imageops::resize(
        &cropped,
        geo.fg_width,
        geo.fg_height,
        imageops::FilterType::Lanczos3,
    );

    imageops::overlay(&mut canvas, &foreground, geo.paste_x, geo.paste_y);
    Ok(canvas)
}
