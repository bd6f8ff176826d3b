use std::{error::Error, path::PathBuf};

use clap::{builder::PossibleValuesParser, Parser};
use court_calib::{write_court_lines_csv, CourtCalibConfig, CourtCalibReport};
use log::{error, info};
#[cfg(not(feature = "tracing"))]
use log::LevelFilter;

/// Calibrate a camera from tennis court line segments.
#[derive(Debug, Parser)]
#[command(author, version, about = "Tennis court camera calibration")]
struct Args {
    /// JSON CourtCalibConfig.
    #[arg(long)]
    config: PathBuf,

    /// Report path; overrides `output_path` from the config.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory for per-line CSV samples; overrides `lines_dir` from the config.
    #[arg(long)]
    lines_dir: Option<PathBuf>,

    /// Log debug output (stderr logger; with `tracing` use `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,

    /// Raise one pipeline stage to debug output; repeatable.
    #[arg(long = "debug-stage", value_parser = PossibleValuesParser::new(court_calib::STAGE_NAMES.iter().copied()))]
    debug_stage: Vec<String>,

    /// Emit JSON log lines.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    json_log: bool,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(args: &Args) {
    let stages: Vec<&str> = args.debug_stage.iter().map(String::as_str).collect();
    #[cfg(feature = "tracing")]
    {
        court_calib::init_tracing(args.json_log, &stages);
        let _ = tracing_log::LogTracer::init();
    }
    #[cfg(not(feature = "tracing"))]
    {
        let level = if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        let _ = court_calib::init_with_stages(level, &stages);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args);

    let cfg = CourtCalibConfig::load_json(&args.config)?;
    let segments = cfg.load_segments(args.config.parent())?;
    info!("loaded {} segments from {}", segments.len(), cfg.segments_path);

    let mut report = CourtCalibReport::new(&cfg, &args.config, segments.len());
    let output_path = args.output.clone().unwrap_or_else(|| cfg.output_path());
    let lines_dir = args.lines_dir.clone().or_else(|| cfg.lines_dir());

    let outcome = cfg
        .build_calibrator()
        .and_then(|calibrator| {
            let res = calibrator.calibrate(&segments, cfg.image_size)?;
            Ok((calibrator, res))
        });

    let failure = match outcome {
        Ok((calibrator, res)) => {
            if let Some(dir) = lines_dir.as_ref() {
                let written =
                    write_court_lines_csv(&res.calib, calibrator.court(), dir, cfg.line_samples)?;
                info!("wrote {} line files to {}", written.len(), dir.display());
            }
            report.set_result(res);
            None
        }
        Err(err) => {
            error!("calibration failed: {err}");
            report.set_error(err.clone());
            Some(err)
        }
    };

    report.write_json(&output_path)?;
    println!("wrote report JSON to {}", output_path.display());

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
