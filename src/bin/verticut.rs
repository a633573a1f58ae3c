use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "verticut", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print probed source metadata as JSON.
    Probe(ProbeArgs),
    /// Render the reframed still preview as a PNG.
    Preview(PreviewArgs),
    /// Transcode to a vertical MP4 (requires `ffmpeg` on PATH).
    Convert(ConvertArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input video path.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input video path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Fraction of height cropped from top and bottom.
    #[arg(long, default_value_t = 0.09)]
    crop: f64,

    /// Foreground zoom relative to canvas width.
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Frame-grab instant in seconds (default: 1s, pulled back for short clips).
    #[arg(long)]
    at: Option<f64>,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input video path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Fraction of height cropped from top and bottom.
    #[arg(long, default_value_t = 0.09)]
    crop: f64,

    /// Foreground zoom relative to canvas width.
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Wall-clock transcode limit in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Transcoder thread cap.
    #[arg(long)]
    threads: Option<u32>,

    /// Encoder speed/quality tradeoff.
    #[arg(long, value_enum, default_value_t = QualityChoice::Fast)]
    quality: QualityChoice,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum QualityChoice {
    Fast,
    Balanced,
    Best,
}

impl From<QualityChoice> for verticut::EncodeQuality {
    fn from(choice: QualityChoice) -> Self {
        match choice {
            QualityChoice::Fast => verticut::EncodeQuality::Fast,
            QualityChoice::Balanced => verticut::EncodeQuality::Balanced,
            QualityChoice::Best => verticut::EncodeQuality::Best,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Convert(args) => cmd_convert(args),
    }
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = verticut::probe_source(&args.in_path)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let cfg = verticut::Config::default();
    let params = verticut::ReframeParams {
        crop_percent: args.crop,
        zoom_level: args.zoom,
    };

    let still = verticut::preview_still_at(&args.in_path, params, &cfg, args.at)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &still,
        still.width(),
        still.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let mut cfg = verticut::Config::default();
    if let Some(timeout) = args.timeout {
        cfg.job_timeout_seconds = timeout;
    }
    if let Some(threads) = args.threads {
        cfg.thread_cap = threads;
    }
    cfg.quality = args.quality.into();
    cfg.validate()?;

    let params = verticut::ReframeParams {
        crop_percent: args.crop,
        zoom_level: args.zoom,
    };

    let result = verticut::convert(&args.in_path, &args.out, params, &cfg)?.ensure_success()?;
    eprintln!(
        "wrote {} in {:.1}s",
        args.out.display(),
        result.elapsed.as_secs_f64()
    );
    Ok(())
}
