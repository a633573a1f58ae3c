//! Verticut reframes arbitrary-aspect video onto a fixed 1080x1920 vertical
//! canvas: crop letterboxing, zoom a sharp foreground, composite it over a
//! blurred stretch of the same source.
//!
//! One [`GeometryDescriptor`] drives both rendering backends (the in-process
//! still [`preview`] and the ffmpeg transcode [`directive`]), so the preview a
//! user approves and the video they download can never disagree on framing.
//! Sources delivered as byte fragments are reconstructed by the
//! [`upload::UploadAssembler`] before probing.
#![forbid(unsafe_code)]

pub mod config;
pub mod directive;
pub mod error;
pub mod executor;
pub mod geometry;
pub mod pipeline;
pub mod preview;
pub mod probe;
pub mod upload;
pub mod workdir;

pub use config::{Config, EncodeQuality};
pub use directive::{DirectiveOpts, TranscodeDirective};
pub use error::{FragmentError, VerticutError, VerticutResult};
pub use executor::{CancelToken, JobExecutor, JobResult, JobState, TranscodeJob};
pub use geometry::{
    CANVAS_HEIGHT, CANVAS_WIDTH, GeometryDescriptor, ReframeParams, SourceDimensions,
};
pub use pipeline::{convert, convert_with_cancel, preview_still, preview_still_at};
pub use probe::{SourceInfo, is_ffmpeg_on_path, is_ffprobe_on_path, probe_source};
pub use upload::{FragmentAck, UploadAssembler};
pub use workdir::Workspace;
