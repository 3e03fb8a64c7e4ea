// ============================================================================
// ColorSlate CLI — headless worksheet processing via command-line arguments
// ============================================================================
//
// Usage examples:
//   colorslate --input page1.png --output flat.png
//   colorslate -i "scans/*.png" --output-dir flattened/
//   colorslate -i page1.png --canvas 1200x1600 -o flat.png
//   colorslate -i page1.png --zones zones.json --verbose
//
// No interactive canvas is opened. Each input image is loaded, letterboxed
// into the requested canvas size, flattened, and written back out as
// full-resolution PNG. A zone payload given with --zones is validated,
// summarized per page, and checked for round-trip stability.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::CanvasSurface;
use crate::error::SlateError;
use crate::io;
use crate::worksheet::ImageSource;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// ColorSlate headless worksheet processor.
///
/// Flatten worksheet pages to PNG and validate zone-definition payloads
/// without opening a canvas.
#[derive(Parser, Debug)]
#[command(
    name = "colorslate",
    about = "ColorSlate headless worksheet processor",
    long_about = "Flatten worksheet page images to full-resolution PNG and\n\
                  validate zone-definition payloads without opening a canvas.\n\n\
                  Example:\n  \
                  colorslate --input page1.png --output flat.png\n  \
                  colorslate -i \"scans/*.png\" --output-dir flattened/"
)]
pub struct CliArgs {
    /// Input worksheet image(s). Glob patterns accepted (e.g. "*.png").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and a .png extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Canvas size as WIDTHxHEIGHT (e.g. 1200x1600); pages are letterboxed
    /// into it. When omitted, each page keeps its native image size.
    #[arg(long, value_name = "WxH")]
    pub canvas: Option<String>,

    /// Zone-definition payload to validate and summarize.
    #[arg(short, long, value_name = "ZONES.json")]
    pub zones: Option<PathBuf>,

    /// Print per-page zone details and per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = everything succeeded, `1` = one or more steps failed.
pub fn run(args: CliArgs) -> ExitCode {
    let mut any_failure = false;

    // -- Zone payload validation ---------------------------------------
    if let Some(zones_path) = &args.zones {
        match check_zone_payload(zones_path, args.verbose) {
            Ok(()) => {}
            Err(e) => {
                eprintln!("error: {}", e);
                any_failure = true;
            }
        }
    }

    // Resolve glob patterns / literal paths to concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let canvas_size = match args.canvas.as_deref().map(parse_canvas_size) {
        Some(Some(size)) => Some(size),
        Some(None) => {
            eprintln!("error: --canvas expects WIDTHxHEIGHT, e.g. 1200x1600.");
            return ExitCode::FAILURE;
        }
        None => None,
    };

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
        ) {
            Some(p) => p,
            None => {
                eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
                any_failure = true;
                continue;
            }
        };

        match flatten_one(input_path, &output_path, canvas_size) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                crate::log_err!("flatten failed for '{}': {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing
// ============================================================================

fn flatten_one(
    input: &Path,
    output: &Path,
    canvas_size: Option<(u32, u32)>,
) -> Result<(), SlateError> {
    let img = io::load_worksheet_image(&ImageSource::Path(input.to_path_buf()))?;
    let (w, h) = canvas_size.unwrap_or((img.width(), img.height()));
    let mut surface = CanvasSurface::new(w, h);
    surface.load_background(&img);
    io::export_composite_png(&surface, output)
}

fn check_zone_payload(path: &Path, verbose: bool) -> Result<(), SlateError> {
    let payload = io::read_zone_payload(path)?;

    // Round-trip stability: serializing and reparsing must reproduce the
    // same document.
    let text = io::serialize_zone_payload(&payload)?;
    let reparsed = io::parse_zone_payload(&text)?;
    if reparsed != payload {
        return Err(SlateError::PayloadInvalid(
            "payload does not survive an export/import round trip".into(),
        ));
    }

    let zone_total: usize = payload.pages.values().map(Vec::len).sum();
    println!(
        "zones: {} page(s), {} zone(s) — {}",
        payload.pages.len(),
        zone_total,
        path.display()
    );
    if verbose {
        for (page_id, records) in &payload.pages {
            println!("  {}: {} zone(s)", page_id, records.len());
            for (i, r) in records.iter().enumerate() {
                println!(
                    "    [{}] {}×{} at ({}, {}) → {:?}",
                    i, r.width, r.height, r.x, r.y, r.answer
                );
            }
        }
    }
    Ok(())
}

// ============================================================================
// Input/output path helpers
// ============================================================================

/// Expand glob patterns and literal paths into a concrete file list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns {
        let mut matched = false;
        if let Ok(paths) = glob::glob(pattern) {
            for path in paths.flatten() {
                if path.is_file() {
                    files.push(path);
                    matched = true;
                }
            }
        }
        // A literal path that glob didn't touch (no wildcard, or quoting)
        if !matched {
            let literal = PathBuf::from(pattern);
            if literal.is_file() {
                files.push(literal);
            }
        }
    }
    files
}

fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
) -> Option<PathBuf> {
    let stem = input.file_stem()?.to_string_lossy();
    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.png", stem)));
    }
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    // Neither given: write a sibling with a distinct stem so the input is
    // never overwritten.
    Some(input.with_file_name(format!("{}-flat.png", stem)))
}

/// Parse "1200x1600" into (1200, 1600).
fn parse_canvas_size(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once(['x', 'X'])?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}
