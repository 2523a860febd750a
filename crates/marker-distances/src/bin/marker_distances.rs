//! marker-distances CLI: analyze images, push them through the upload
//! handler, or render dictionary markers.

use clap::{Parser, Subcommand};
use log::LevelFilter;
use marker_distances::aruco::draw_marker;
use marker_distances::core::GrayImage;
use marker_distances::{
    GeometryReporter, LastAnalysisCache, MarkerService, Request, ResponseBody,
    ServiceConfig, StatusCache, UploadPart,
};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "marker-distances")]
#[command(about = "Detect fiducial markers and report pairwise pixel distances")]
#[command(version)]
struct Cli {
    /// JSON service configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dictionary code table (overrides `dictionary_path` from the config).
    #[arg(long, global = true)]
    dictionary: Option<PathBuf>,

    /// Upload directory (overrides `upload_dir` from the config).
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Log level; with `tracing`, used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze images in place and print their reports.
    Analyze {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Store images through the upload handler and print each response.
    Upload {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Render one dictionary marker to an image file.
    Draw {
        #[arg(long)]
        id: u32,

        /// Side of one marker cell in pixels.
        #[arg(long, default_value = "20")]
        cell_px: usize,

        /// White quiet zone around the marker, in cells.
        #[arg(long, default_value = "2")]
        margin_cells: usize,

        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    init_logging(cli.log_level)?;

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load_json(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(path) = cli.dictionary {
        config.dictionary_path = Some(path);
    }
    if let Some(dir) = cli.upload_dir {
        config.upload_dir = dir;
    }

    match cli.command {
        Commands::Analyze { images } => run_analyze(&config, &images),
        Commands::Upload { images } => run_upload(&config, &images),
        Commands::Draw {
            id,
            cell_px,
            margin_cells,
            out,
        } => run_draw(&config, id, cell_px, margin_cells, &out),
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter) -> CliResult<()> {
    marker_distances::core::init_with_level(level)?;
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(level: LevelFilter) -> CliResult<()> {
    marker_distances::core::init_tracing(false, level);
    let _ = LogTracer::init();
    Ok(())
}

fn run_analyze(config: &ServiceConfig, images: &[PathBuf]) -> CliResult<()> {
    let detector = config.build_detector()?;
    let cache = Arc::new(LastAnalysisCache::default());
    let reporter = GeometryReporter::new(detector, Arc::clone(&cache));
    let status = StatusCache::new(cache);

    for path in images {
        let result = reporter
            .analyze_path(path)
            .map_err(|e| -> CliError { format!("{}: {e}", path.display()).into() })?;
        for line in result.messages() {
            println!("{line}");
        }
    }

    println!("{}", serde_json::to_string(&status.status())?);
    Ok(())
}

fn run_upload(config: &ServiceConfig, images: &[PathBuf]) -> CliResult<()> {
    let service = MarkerService::new(config.upload_store(), config.build_detector()?);

    for path in images {
        let bytes = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let response = service.handle(Request::Upload(Some(UploadPart::new(filename, bytes))))?;
        match &response.body {
            ResponseBody::Json(value) => println!("{} {value}", response.status),
            ResponseBody::Text(text) => println!("{} {text}", response.status),
            ResponseBody::Bytes(bytes) => println!("{} <{} bytes>", response.status, bytes.len()),
        }
    }

    println!("{}", serde_json::to_string(&service.status().status())?);
    Ok(())
}

fn run_draw(
    config: &ServiceConfig,
    id: u32,
    cell_px: usize,
    margin_cells: usize,
    out: &Path,
) -> CliResult<()> {
    let dict = config.load_dictionary()?;
    let marker = draw_marker(&dict, id, cell_px).ok_or_else(|| -> CliError {
        format!("dictionary {} has no marker {id} (or cell size is 0)", dict.name).into()
    })?;

    let margin = margin_cells * cell_px;
    let mut canvas = GrayImage::filled(marker.width + 2 * margin, marker.height + 2 * margin, 255);
    canvas.paste(&marker, margin, margin);

    let img = image::GrayImage::from_raw(canvas.width as u32, canvas.height as u32, canvas.data)
        .ok_or("marker canvas does not match its dimensions")?;
    img.save(out)?;
    log::info!("marker {id} written to {}", out.display());
    Ok(())
}
