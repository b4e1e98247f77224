use std::{path::PathBuf, sync::Arc, time::Instant};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use vidsum::{
    FfmpegLogLevel, HeuristicAnalyzer, OperationType, Pipeline, PipelineOptions, ProgressCallback,
    ProgressInfo, PromptStyle, SummarySink, TesseractExtractor, VideoSource, VidsumError,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vidsum summarize lecture.mp4 --stride 30 --progress --ocr\n  vidsum summarize talk.mkv --notes --model gemini-1.5-pro\n  vidsum summarize clip.mp4 --no-summary --json > report.json\n  vidsum metadata clip.mp4 --json\n  vidsum completions zsh > _vidsum";

const DEFAULT_OUT_DIR: &str = "output/summaries";

#[derive(Debug, Parser)]
#[command(
    name = "vidsum",
    version,
    about = "Segment videos into scenes and summarize them with a language model",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while decoding.
    #[arg(long, global = true)]
    progress: bool,

    /// Log level for both vidsum and FFmpeg (quiet, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Worker threads for frame analysis (requires the `rayon` feature).
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process a video and write its summary.
    #[command(
        about = "Summarize a video",
        after_help = "Examples:\n  vidsum summarize lecture.mp4\n  vidsum summarize lecture.mp4 --stride 15 --threshold 25 --resize 640x480\n  vidsum summarize lecture.mp4 --out-dir notes --notes"
    )]
    Summarize {
        /// Input video path.
        input: PathBuf,
        /// Analyze every Nth frame.
        #[arg(long, default_value_t = PipelineOptions::DEFAULT_SAMPLE_STRIDE)]
        stride: u64,
        /// Scene cut threshold on the 0-255 mean luma difference scale.
        #[arg(long, default_value_t = PipelineOptions::DEFAULT_SCENE_THRESHOLD)]
        threshold: f64,
        /// Stop after this many sampled frames.
        #[arg(long)]
        max_frames: Option<u64>,
        /// Rescale frames before analysis, as WIDTHxHEIGHT.
        #[arg(long)]
        resize: Option<String>,
        /// Directory the summary is written to.
        #[arg(long, default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
        /// Ask for hierarchical notes instead of a summary.
        #[arg(long)]
        notes: bool,
        /// Model used by the summarization service.
        #[arg(long)]
        model: Option<String>,
        /// Skip summarization and only build the report.
        #[arg(long)]
        no_summary: bool,
        /// Extract on-screen text with Tesseract from PATH.
        #[arg(long)]
        ocr: bool,
        /// Extract on-screen text with the Tesseract executable at PATH.
        #[arg(long, value_name = "PATH")]
        tesseract: Option<PathBuf>,
    },

    /// Print stream metadata.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Metadata {
        /// Input video path.
        input: PathBuf,
        /// Output metadata as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_resolution(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.trim().split_once(['x', 'X'])?;
    let width = width.trim().parse::<u32>().ok()?;
    let height = height.trim().parse::<u32>().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

fn log_filter(global: &GlobalOptions) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        vidsum::set_ffmpeg_log_level(parsed);
        let directive = match parsed {
            FfmpegLogLevel::Quiet => "off",
            FfmpegLogLevel::Fatal | FfmpegLogLevel::Error => "error",
            FfmpegLogLevel::Warning => "warn",
            FfmpegLogLevel::Info => "info",
            FfmpegLogLevel::Debug => "debug",
        };
        return Ok(format!("vidsum={directive}"));
    }

    vidsum::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    Ok(if global.verbose {
        "vidsum=debug".to_string()
    } else {
        "vidsum=info".to_string()
    })
}

fn init_logging(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let default = log_filter(global)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(global.verbose)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| format!("failed to initialise logging: {error}"))?;
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} frames [{elapsed_precise}<{eta}] {msg}",
        )?
        .progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.operation != OperationType::Decoding {
            return;
        }
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if let Some(timestamp) = info.current_timestamp {
            self.bar.set_message(format!("{:.1}s", timestamp.as_secs_f64()));
        }
    }
}

fn pipeline_options(
    global: &GlobalOptions,
    stride: u64,
    threshold: f64,
    max_frames: Option<u64>,
    resize: Option<&str>,
    progress: Option<Arc<TerminalProgress>>,
) -> Result<PipelineOptions, Box<dyn std::error::Error>> {
    let mut options = PipelineOptions::new()
        .with_sample_stride(stride)
        .with_scene_threshold(threshold);

    if let Some(max_frames) = max_frames {
        options = options.with_max_frames(max_frames);
    }

    if let Some(resize) = resize {
        let (width, height) = parse_resolution(resize)
            .ok_or(format!("unsupported --resize (expected WIDTHxHEIGHT): {resize}"))?;
        options = options.with_resolution(width, height);
    }

    if let Some(progress) = progress {
        options = options.with_progress(progress);
    }

    if let Some(threads) = global.threads.filter(|threads| *threads > 0) {
        #[cfg(feature = "rayon")]
        {
            options = options.with_analysis_workers(threads);
        }
        #[cfg(not(feature = "rayon"))]
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("--threads {threads} requires building with the `rayon` feature").yellow()
        );
    }

    Ok(options)
}

fn build_analyzer(ocr: bool, tesseract: Option<PathBuf>) -> HeuristicAnalyzer {
    let analyzer = HeuristicAnalyzer::default();
    if !ocr && tesseract.is_none() {
        return analyzer;
    }

    let mut extractor = TesseractExtractor::new();
    if let Some(binary) = tesseract {
        extractor = extractor.with_binary(binary);
    }
    if !extractor.is_available() {
        log::warn!(
            "Tesseract not found at {}; OCR disabled",
            extractor.binary().display()
        );
        return analyzer;
    }

    log::info!("OCR enabled via {}", extractor.binary().display());
    analyzer.with_text_extractor(extractor)
}

#[cfg(feature = "gemini")]
fn build_sink(model: Option<String>, style: PromptStyle) -> Result<Box<dyn SummarySink>, VidsumError> {
    let mut config = vidsum::GeminiConfig::from_env()?.with_prompt_style(style);
    if let Some(model) = model {
        config = config.with_model(model);
    }
    Ok(Box::new(vidsum::GeminiSink::new(config)?.with_retries()))
}

#[cfg(not(feature = "gemini"))]
fn build_sink(_model: Option<String>, _style: PromptStyle) -> Result<Box<dyn SummarySink>, VidsumError> {
    Err(VidsumError::SinkFailure(
        "built without the `gemini` feature".to_string(),
    ))
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global)?;

    match cli.command {
        Commands::Summarize {
            input,
            stride,
            threshold,
            max_frames,
            resize,
            out_dir,
            json,
            notes,
            model,
            no_summary,
            ocr,
            tesseract,
        } => {
            let progress = if cli.global.progress {
                Some(Arc::new(TerminalProgress::new()?))
            } else {
                None
            };
            let options = pipeline_options(
                &cli.global,
                stride,
                threshold,
                max_frames,
                resize.as_deref(),
                progress.clone(),
            )?;

            let started = Instant::now();
            let pipeline = Pipeline::new(options, build_analyzer(ocr, tesseract))?;
            let output = pipeline.run(&input)?;
            if let Some(progress) = &progress {
                progress.bar.finish_and_clear();
            }

            let report = &output.report;
            eprintln!(
                "{} {} frames, {} scenes, {:.2}s of video in {:.1}s",
                "processed".green().bold(),
                report.frames_processed,
                report.scenes_detected,
                report.total_duration,
                started.elapsed().as_secs_f64(),
            );

            if json {
                println!("{}", report.to_json_pretty()?);
            }

            if no_summary {
                return Ok(());
            }

            let style = if notes {
                PromptStyle::Notes
            } else {
                PromptStyle::Summary
            };
            let summary = match build_sink(model, style) {
                Ok(sink) => output.summarize_with(&*sink),
                Err(error) => {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        error.to_string().yellow()
                    );
                    match error {
                        VidsumError::SinkFailure(_) | VidsumError::SinkRejected(_) => {
                            error.to_string()
                        }
                        other => VidsumError::SinkFailure(other.to_string()).to_string(),
                    }
                }
            };

            if !json {
                println!("\n----- SUMMARY -----\n");
                println!("{summary}");
                println!("\n-------------------\n");
            }

            let path = vidsum::output::save_summary(&out_dir, &input, &summary)?;
            eprintln!("{} {}", "saved".green().bold(), path.display());
        }
        Commands::Metadata { input, json } => {
            let source = VideoSource::open(&input)?;
            let metadata = source.metadata();
            if json {
                println!("{}", serde_json::to_string_pretty(metadata)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:.3}s", metadata.duration.as_secs_f64());
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec,
                );
                match metadata.frame_count {
                    Some(count) => println!("Frames: {count}"),
                    None => println!("Frames: unknown"),
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "vidsum", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
