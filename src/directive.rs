use std::path::Path;

use crate::config::{Config, EncodeQuality};
use crate::geometry::{CANVAS_HEIGHT, CANVAS_WIDTH, GeometryDescriptor};

/// Knobs for building one transcode directive.
#[derive(Clone, Debug)]
pub struct DirectiveOpts {
    /// Hard cap on output duration in seconds (`-t`).
    pub duration_cap_seconds: f64,
    /// Transcoder thread ceiling.
    pub thread_cap: u32,
    pub quality: EncodeQuality,
    /// Boxblur pass count for the background branch.
    pub blur_passes: u32,
    /// Re-encode audio when the source has a track; `false` drops audio.
    pub include_audio: bool,
    pub audio_bitrate_kbps: u32,
}

impl DirectiveOpts {
    /// Options derived from configuration, with audio presence from probing.
    pub fn from_config(cfg: &Config, include_audio: bool) -> Self {
        Self {
            duration_cap_seconds: cfg.output_duration_cap_seconds,
            thread_cap: cfg.thread_cap,
            quality: cfg.quality,
            blur_passes: cfg.blur_passes,
            include_audio,
            audio_bitrate_kbps: cfg.audio_bitrate_kbps,
        }
    }
}

/// The structured crop/scale/blur/overlay description handed to the external
/// transcoder.
///
/// The crop is expressed as fractions of input height rather than absolute
/// pixels because the transcoder evaluates the filter graph against the
/// original unscaled input. The effective fractions are kept on the struct so
/// tests can verify, without running ffmpeg, that this builder and the preview
/// renderer agree on geometry.
#[derive(Clone, Debug)]
pub struct TranscodeDirective {
    filter_graph: String,
    crop_top_fraction: f64,
    kept_height_fraction: f64,
    scale_factor: f64,
    paste: (i64, i64),
    opts: DirectiveOpts,
}

impl TranscodeDirective {
    /// Build the directive for one geometry descriptor.
    pub fn build(geo: &GeometryDescriptor, opts: DirectiveOpts) -> Self {
        let top = geo.crop_top_fraction();
        let kept = geo.kept_height_fraction();

        // Background: stretch with forced aspect increase then crop back to
        // the canvas, so aspect mismatch never letterboxes the blur layer.
        let filter_graph = format!(
            "[0:v]crop=in_w:in_h*{kept:.6}:0:in_h*{top:.6},scale={fg_w}:-2:flags=bilinear[main];\
             [0:v]crop=in_w:in_h*{kept:.6}:0:in_h*{top:.6},\
             scale={cw}:{ch}:force_original_aspect_ratio=increase:flags=bilinear,\
             boxblur={blur}:{passes},crop={cw}:{ch}[bg];\
             [bg][main]overlay=(W-w)/2:(H-h)/2",
            fg_w = geo.fg_width,
            cw = CANVAS_WIDTH,
            ch = CANVAS_HEIGHT,
            blur = geo.blur_radius,
            passes = opts.blur_passes,
        );

        Self {
            filter_graph,
            crop_top_fraction: top,
            kept_height_fraction: kept,
            scale_factor: geo.scale_factor(),
            paste: (geo.paste_x, geo.paste_y),
            opts,
        }
    }

    pub fn filter_graph(&self) -> &str {
        &self.filter_graph
    }

    /// Top crop fraction the transcoder will apply.
    pub fn effective_crop_top_fraction(&self) -> f64 {
        self.crop_top_fraction
    }

    /// Kept-height fraction the transcoder will apply.
    pub fn effective_kept_height_fraction(&self) -> f64 {
        self.kept_height_fraction
    }

    /// Foreground scale relative to the canvas width.
    pub fn effective_scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Overlay offset; the centered `(W-w)/2:(H-h)/2` expression evaluates to
    /// exactly this pair for the fixed canvas.
    pub fn effective_paste(&self) -> (i64, i64) {
        self.paste
    }

    /// Full transcoder argument vector for `input` -> `output`.
    pub fn to_args(&self, input: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-i".into(),
            input.into(),
            "-threads".into(),
            self.opts.thread_cap.to_string().into(),
            "-filter_complex".into(),
            self.filter_graph.clone().into(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            self.opts.quality.preset().into(),
            "-crf".into(),
            self.opts.quality.crf().to_string().into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-movflags".into(),
            "+faststart".into(),
        ];
        if self.opts.include_audio {
            args.extend([
                "-c:a".into(),
                "aac".into(),
                "-b:a".into(),
                format!("{}k", self.opts.audio_bitrate_kbps).into(),
                "-ac".into(),
                "2".into(),
            ]);
        } else {
            args.push("-an".into());
        }
        args.extend([
            "-t".into(),
            format!("{:.3}", self.opts.duration_cap_seconds).into(),
        ]);
        args.push(output.into());
        args
    }
}
