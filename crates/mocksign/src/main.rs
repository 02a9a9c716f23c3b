//! mocksign: sign a rasterized document from the command line.
//!
//! Opens a document (one page image or a directory of them), anchors
//! signatures at the requested page positions and writes the result with
//! the scanner look applied.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin mocksign -- [OPTIONS] <DOCUMENT>
//! mocksign scans/ --signatures sigs/ --place 1:120,80 --output signed.pdf
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use image::DynamicImage;
use mocksign_core::{
    DocumentProvider, Dimensions, FilterKind, FilterPipeline, Point, ScannerConfig, Session, Tool,
};
use mocksign_io::{FolderSignatureSource, HeadlessCanvas, ImageSequenceProvider, save_png};
use tracing_subscriber::EnvFilter;

/// Place signature images on document pages and export them with a
/// scanned look.
///
/// Pages and positions are 1-based page numbers and page-space pixel
/// coordinates with the origin at the bottom-left corner.
#[derive(Parser)]
#[command(name = "mocksign", version)]
struct Cli {
    /// Document to sign: a page image or a directory of page images.
    document: PathBuf,

    /// Folder of signature images (PNG, JPEG, BMP, WebP, TIFF).
    #[arg(long)]
    signatures: Option<PathBuf>,

    /// Anchor a signature as PAGE:X,Y[:SCALE[:NAME]].
    ///
    /// NAME defaults to the first signature in the folder and SCALE to 1.
    #[arg(long = "place", value_name = "PAGE:X,Y[:SCALE[:NAME]]", value_parser = parse_placement)]
    placements: Vec<Placement>,

    /// Write the signed document as PDF.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Paste signatures opaquely instead of blending away their paper.
    #[arg(long)]
    keep_background: bool,

    /// Enable a filter (`grayscale`, `noise`, `blur`, `random_rotate`, `autocontrast`).
    #[arg(long, value_name = "KIND")]
    enable: Vec<FilterKind>,

    /// Disable a filter.
    #[arg(long, value_name = "KIND")]
    disable: Vec<FilterKind>,

    /// Set a filter strength.
    #[arg(long, value_name = "KIND=VALUE", value_parser = parse_strength)]
    strength: Vec<StrengthOverride>,

    /// Scanner config as a JSON file, refined by the individual flags.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Full scanner config as a JSON string.
    ///
    /// When provided, `--config` and all individual filter and
    /// background flags are ignored. The JSON must be a valid
    /// `ScannerConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Seed for the random filters, for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Size of the headless editing canvas.
    #[arg(long, value_name = "WxH", default_value = "400x400", value_parser = parse_dimensions)]
    canvas: Dimensions,

    /// Resolution used to size PDF pages.
    #[arg(long, default_value_t = mocksign_io::pdf::DEFAULT_DPI)]
    dpi: f64,

    /// Write one page with the scanner look as PNG.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Page written by `--preview`.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    preview_page: usize,

    /// Write the editing canvas (first page with markers) as PNG.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Log more (-v info, -vv debug). `RUST_LOG` applies otherwise.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// A `--place` request.
#[derive(Debug, Clone, PartialEq)]
struct Placement {
    /// 1-based page number.
    page: usize,
    anchor: Point,
    scale: f64,
    name: Option<String>,
}

/// A `--strength` request.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StrengthOverride {
    kind: FilterKind,
    value: f32,
}

fn parse_placement(s: &str) -> Result<Placement, String> {
    let mut parts = s.splitn(4, ':');
    let page = parts
        .next()
        .unwrap_or_default()
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|&page| page > 0)
        .ok_or_else(|| format!("invalid page in {s:?} (expected a number from 1)"))?;

    let coords = parts
        .next()
        .ok_or_else(|| format!("missing X,Y in {s:?}"))?;
    let (x, y) = coords
        .split_once(',')
        .ok_or_else(|| format!("invalid position {coords:?} (expected X,Y)"))?;
    let coordinate = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid coordinate {v:?} in {s:?}"))
    };
    let anchor = Point::new(coordinate(x)?, coordinate(y)?);

    let scale = match parts.next() {
        None => 1.0,
        Some(scale) => scale
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid scale {scale:?}: {e}"))?,
    };
    let name = parts.next().filter(|n| !n.is_empty()).map(str::to_owned);

    Ok(Placement {
        page,
        anchor,
        scale,
        name,
    })
}

fn parse_strength(s: &str) -> Result<StrengthOverride, String> {
    let (kind, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid strength {s:?} (expected KIND=VALUE)"))?;
    let kind = kind.parse::<FilterKind>().map_err(|e| e.to_string())?;
    let value = value
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("invalid strength value {value:?}: {e}"))?;
    Ok(StrengthOverride { kind, value })
}

fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size {s:?} (expected WxH)"))?;
    let side = |v: &str| {
        v.trim()
            .parse::<u32>()
            .ok()
            .filter(|&v| v > 0)
            .ok_or_else(|| format!("invalid size {s:?} (sides must be positive)"))
    };
    Ok(Dimensions::new(side(w)?, side(h)?))
}

/// Build a [`ScannerConfig`] from CLI arguments.
///
/// `--config-json` wins outright. Otherwise `--config` (or the defaults)
/// is refined by `--keep-background`, `--enable`, `--disable` and
/// `--strength`, in that order.
fn config_from_cli(cli: &Cli) -> Result<ScannerConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let mut config = match cli.config {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
            serde_json::from_str::<ScannerConfig>(&text)
                .map_err(|e| format!("Error parsing {}: {e}", path.display()))?
        }
        None => ScannerConfig::default(),
    };

    if cli.keep_background {
        config.remove_background = false;
    }

    let mut pipeline = FilterPipeline::default();
    pipeline
        .apply_settings(&config.filters)
        .map_err(|e| format!("Invalid config: {e}"))?;
    for (kinds, enabled) in [(&cli.enable, true), (&cli.disable, false)] {
        for &kind in kinds {
            if let Some(filter) = pipeline.filter_mut(kind) {
                filter.set_enabled(enabled);
            }
        }
    }
    for request in &cli.strength {
        if let Some(filter) = pipeline.filter_mut(request.kind) {
            filter
                .set_strength(request.value)
                .map_err(|e| format!("Invalid --strength: {e}"))?;
        }
    }
    config.filters = pipeline.settings();
    Ok(config)
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    tracing::debug!(?config, "scanner config");

    let provider = ImageSequenceProvider { dpi: cli.dpi };
    let pages = provider
        .open(&cli.document)
        .map_err(|e| format!("Error opening {}: {e}", cli.document.display()))?;
    eprintln!("Document: {} ({} pages)", cli.document.display(), pages.len());

    let mut canvas = HeadlessCanvas::new(cli.canvas);
    let mut session: Session<HeadlessCanvas> = cli
        .seed
        .map_or_else(Session::from_os_rng, Session::with_seed);
    session
        .apply_config(&config)
        .map_err(|e| format!("Invalid config: {e}"))?;

    if let Some(ref folder) = cli.signatures {
        let report = FolderSignatureSource
            .load_report(folder)
            .map_err(|e| format!("Error loading signatures: {e}"))?;
        eprintln!(
            "Signatures: {} loaded, {} skipped",
            report.signatures.len(),
            report.skipped.len(),
        );
        session.set_signatures(report.signatures);
    }

    session
        .open(pages, &mut canvas)
        .map_err(|e| format!("Error showing document: {e}"))?;

    for placement in &cli.placements {
        let name = match placement.name {
            Some(ref name) => name.clone(),
            None => session
                .selected_signature()
                .map(|s| s.name.clone())
                .ok_or("--place needs --signatures with at least one readable image")?,
        };
        let id = session
            .place_signature(placement.page - 1, placement.anchor, &name, placement.scale)
            .map_err(|e| format!("Error placing {name} on page {}: {e}", placement.page))?;
        tracing::info!(
            %id,
            page = placement.page,
            x = placement.anchor.x,
            y = placement.anchor.y,
            scale = placement.scale,
            signature = %name,
            "signature anchored"
        );
        eprintln!("Placed {name} {id} on page {}", placement.page);
    }
    session
        .refresh(&mut canvas)
        .map_err(|e| format!("Error drawing canvas: {e}"))?;

    if let Some(ref path) = cli.snapshot {
        write_png(path, &DynamicImage::ImageRgba8(canvas.snapshot()))?;
    }

    if let Some(ref path) = cli.preview {
        session
            .set_tool(Tool::Preview, &mut canvas)
            .map_err(|e| format!("Error rendering preview: {e}"))?;
        let page = session
            .render_page(cli.preview_page - 1)
            .map_err(|e| format!("Error rendering page {}: {e}", cli.preview_page))?;
        write_png(path, &page)?;
    }

    match cli.output {
        Some(ref path) => {
            let rendered = session
                .export()
                .map_err(|e| format!("Error rendering document: {e}"))?;
            provider
                .save(path, &rendered)
                .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
            eprintln!("PDF written to {} ({} pages)", path.display(), rendered.len());
        }
        None if cli.preview.is_none() && cli.snapshot.is_none() => {
            tracing::warn!("no output requested");
            eprintln!("Nothing written; pass --output, --preview or --snapshot");
        }
        None => {}
    }

    Ok(())
}

fn write_png(path: &Path, image: &DynamicImage) -> Result<(), String> {
    save_png(path, image).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!(
        "PNG written to {} ({}x{})",
        path.display(),
        image.width(),
        image.height(),
    );
    Ok(())
}
