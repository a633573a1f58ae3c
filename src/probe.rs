use std::path::{Path, PathBuf};

use crate::error::{VerticutError, VerticutResult};
use crate::geometry::SourceDimensions;

/// Probed metadata for one source file.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SourceInfo {
    /// Path handed to the prober.
    pub path: PathBuf,
    /// Width/height/duration of the first video stream.
    pub dims: SourceDimensions,
    /// Whether at least one audio stream was detected.
    pub has_audio: bool,
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    std::process::Command::new(tool)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Probe source metadata through `ffprobe`.
///
/// Any probe failure or missing field is an [`VerticutError::UnreadableSource`];
/// no default dimensions are ever assumed.
pub fn probe_source(path: &Path) -> VerticutResult<SourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| VerticutError::unreadable_source(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(VerticutError::unreadable_source(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| VerticutError::unreadable_source(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| VerticutError::unreadable_source("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| VerticutError::unreadable_source("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| VerticutError::unreadable_source("missing video height from ffprobe"))?;
    if width == 0 || height == 0 {
        return Err(VerticutError::unreadable_source(
            "ffprobe reported zero-sized video stream",
        ));
    }

    // Stream duration is preferred; some containers only report it at the
    // format level.
    let duration_seconds = video_stream
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| VerticutError::unreadable_source("missing duration from ffprobe"))?;
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(VerticutError::unreadable_source(format!(
            "ffprobe reported invalid duration {duration_seconds}"
        )));
    }

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(SourceInfo {
        path: path.to_path_buf(),
        dims: SourceDimensions {
            width,
            height,
            duration_seconds,
        },
        has_audio,
    })
}

// No unit tests here: probing shells out to `ffprobe` and is validated by the
// integration tests that are skipped when the tool is unavailable.
