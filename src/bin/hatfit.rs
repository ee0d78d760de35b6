use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "hatfit", version)]
struct Cli {
    /// Pipeline configuration JSON (sizes, matte thresholds, shadow).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reframe a photo into an opaque square.
    Crop(CropArgs),
    /// Remove the background of a generated overlay.
    Matte(MatteArgs),
    /// Composite a photo and a matted overlay into the final PNG.
    Compose(ComposeArgs),
}

#[derive(Args, Debug)]
struct CropArgs {
    /// Input photo.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image (PNG, or JPEG when the extension is .jpg/.jpeg).
    #[arg(long)]
    out: PathBuf,

    /// Horizontal pan in container pixels.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pan_x: f64,

    /// Vertical pan in container pixels.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pan_y: f64,

    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Edge length of the on-screen crop container.
    #[arg(long, default_value_t = 280.0)]
    container: f64,

    /// Output edge length; defaults to the configured crop size.
    #[arg(long)]
    size: Option<u32>,

    /// Write the normalized photo transform as JSON for a later `compose`.
    #[arg(long)]
    transform_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MatteArgs {
    /// Generated overlay image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG with transparent background.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct ComposeArgs {
    /// Raw (uncropped) photo.
    #[arg(long)]
    photo: PathBuf,

    /// Matted overlay PNG.
    #[arg(long)]
    overlay: PathBuf,

    /// Output PNG.
    #[arg(long)]
    out: PathBuf,

    /// Normalized photo transform JSON written by `crop --transform-out`.
    #[arg(long, conflicts_with_all = ["photo_x", "photo_y", "photo_scale"])]
    photo_transform: Option<PathBuf>,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    photo_x: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    photo_y: f64,

    #[arg(long, default_value_t = 1.0)]
    photo_scale: f64,

    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    overlay_x: f64,

    #[arg(long, default_value_t = 0.2, allow_negative_numbers = true)]
    overlay_y: f64,

    #[arg(long, default_value_t = 1.0)]
    overlay_scale: f64,

    /// Overlay rotation in degrees.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    overlay_rotation: f64,

    /// Canvas edge length; defaults to the configured canvas size.
    #[arg(long)]
    size: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = hatfit::PipelineConfig::load(cli.config.as_deref())?;
    match cli.cmd {
        Command::Crop(args) => cmd_crop(&cfg, args),
        Command::Matte(args) => cmd_matte(&cfg, args),
        Command::Compose(args) => cmd_compose(&cfg, args),
    }
}

fn read_source(cfg: &hatfit::PipelineConfig, path: &Path) -> anyhow::Result<hatfit::RasterBuffer> {
    let raster = read_image(path)?;
    Ok(hatfit::limit_dimensions(raster, cfg.source.max_dimension)?)
}

fn read_image(path: &Path) -> anyhow::Result<hatfit::RasterBuffer> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    hatfit::decode_image(&bytes).with_context(|| format!("decode image '{}'", path.display()))
}

fn write_bytes(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}

fn format_for(path: &Path) -> hatfit::OutputFormat {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => hatfit::OutputFormat::PREVIEW_JPEG,
        _ => hatfit::OutputFormat::Png,
    }
}

fn cmd_crop(cfg: &hatfit::PipelineConfig, args: CropArgs) -> anyhow::Result<()> {
    let source = read_source(cfg, &args.in_path)?;
    let request = hatfit::CropRequest::new(
        hatfit::Vec2::new(args.pan_x, args.pan_y),
        args.zoom,
        args.container,
    )
    .with_output_size(args.size.unwrap_or(cfg.crop.output_size));

    let out = hatfit::crop_photo(&source, &request)?;
    let bytes = hatfit::encode_image(&out.raster, format_for(&args.out))?;
    write_bytes(&args.out, &bytes)?;

    if let Some(path) = &args.transform_out {
        let json = serde_json::to_vec_pretty(&out.transform)?;
        write_bytes(path, &json)?;
    }

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_matte(cfg: &hatfit::PipelineConfig, args: MatteArgs) -> anyhow::Result<()> {
    let overlay = read_image(&args.in_path)?;
    let matte = hatfit::MatteExtractor::new(cfg.matte).extract(overlay);
    let report = &matte.report;
    eprintln!(
        "background: {:?}, transparent: {}, opaque: {}",
        report.background, report.transparent_pixels, report.opaque_pixels
    );

    let bytes = hatfit::encode_image(&matte.raster, hatfit::OutputFormat::Png)?;
    write_bytes(&args.out, &bytes)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn read_photo_transform(path: &Path) -> anyhow::Result<hatfit::NormalizedTransform> {
    let f = File::open(path).with_context(|| format!("open transform '{}'", path.display()))?;
    let t = serde_json::from_reader(BufReader::new(f)).with_context(|| "parse transform JSON")?;
    Ok(t)
}

fn cmd_compose(cfg: &hatfit::PipelineConfig, args: ComposeArgs) -> anyhow::Result<()> {
    let photo = read_source(cfg, &args.photo)?;
    let overlay = read_image(&args.overlay)?;

    let photo_transform = match &args.photo_transform {
        Some(path) => read_photo_transform(path)?,
        None => hatfit::NormalizedTransform {
            x: args.photo_x,
            y: args.photo_y,
            scale: args.photo_scale,
        },
    };
    let overlay_transform = hatfit::OverlayTransform {
        x: args.overlay_x,
        y: args.overlay_y,
        scale: args.overlay_scale,
        rotation_degrees: args.overlay_rotation,
    };

    let mut settings = cfg.compose;
    if let Some(size) = args.size {
        settings.canvas_size = size;
    }
    let composer = hatfit::LayerComposer::new(settings)?;
    let out = composer.compose(&photo, photo_transform, &overlay, overlay_transform)?;

    let bytes = hatfit::encode_image(&out, hatfit::OutputFormat::Png)?;
    write_bytes(&args.out, &bytes)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
