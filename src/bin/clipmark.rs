use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};

use clipmark::{
    ClipOptions, ClipWriter, Document, DuplicatePolicy, FfmpegLogLevel, HtmlOptions,
    ImageFormat, MediaMetadata, MediaProbe, Pipeline, PipelineOptions, PipelineStage,
    ProcessingReport, ProgressCallback, ProgressInfo, ScanOptions, Segment, VideoSource,
    format_timestamp, parse_timestamp,
};

const CLI_AFTER_HELP: &str = "Examples:\n  clipmark build post.md talk.mp4 --out site --progress\n  clipmark scan post.md --json\n  clipmark probe talk.mp4 intro.mkv\n  clipmark screenshot talk.mp4 --at 1:05 --out still.jpg\n  clipmark clip talk.mp4 --at 1:30 --duration 30 --out demo.mp4\n  clipmark completions zsh > _clipmark";

/// Exit code for `build --strict` when some markers failed.
const EXIT_MARKERS_FAILED: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "clipmark",
    version,
    about = "Turn a marked-up blog draft and its video into an HTML page with screenshots and clips",
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

    /// FFmpeg log level (quiet, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the HTML page and media directory.
    #[command(
        about = "Build an HTML page from a document and a video",
        after_help = "Examples:\n  clipmark build post.md talk.mp4 --out site\n  clipmark build post.md talk.mp4 --out site --image-format png --duplicates error --strict"
    )]
    Build {
        /// Marked-up document (plain text or Markdown).
        document: PathBuf,
        /// Source video.
        video: PathBuf,
        /// Output directory.
        #[arg(long)]
        out: PathBuf,
        /// Screenshot format: jpg | png.
        #[arg(long, default_value = "jpg")]
        image_format: String,
        /// Repeated timestamps: warn | allow | error.
        #[arg(long, default_value = "warn")]
        duplicates: String,
        /// Leave audio out of clips.
        #[arg(long)]
        no_audio: bool,
        /// H.264 CRF quality (0-51, lower is better).
        #[arg(long, default_value_t = 23)]
        crf: u32,
        /// x264 preset.
        #[arg(long, default_value = "veryfast")]
        preset: String,
        /// Page title.
        #[arg(long)]
        title: Option<String>,
        /// Name of the HTML file inside the output directory.
        #[arg(long)]
        html_name: Option<String>,
        /// Show a progress bar.
        #[arg(long)]
        progress: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
        /// Exit with status 2 if any marker failed.
        #[arg(long)]
        strict: bool,
    },

    /// List the markers in a document without touching any video.
    #[command(about = "List markers found in a document")]
    Scan {
        /// Marked-up document.
        document: PathBuf,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print video metadata.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Probe {
        /// One or more video paths.
        #[arg(required = true)]
        videos: Vec<PathBuf>,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Save a single frame.
    #[command(about = "Save the frame at a timestamp")]
    Screenshot {
        /// Video path.
        video: PathBuf,
        /// Timestamp (SS, MM:SS or HH:MM:SS).
        #[arg(long)]
        at: String,
        /// Output image path; the format follows the extension.
        #[arg(long)]
        out: PathBuf,
    },

    /// Cut a clip.
    #[command(about = "Cut a clip starting at a timestamp")]
    Clip {
        /// Video path.
        video: PathBuf,
        /// Start timestamp.
        #[arg(long)]
        at: String,
        /// Clip length.
        #[arg(long)]
        duration: String,
        /// Output MP4 path.
        #[arg(long)]
        out: PathBuf,
        /// Leave audio out of the clip.
        #[arg(long)]
        no_audio: bool,
        /// H.264 CRF quality.
        #[arg(long, default_value_t = 23)]
        crf: u32,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn init_logging(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let level = if global.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();

    if let Some(value) = &global.log_level {
        let parsed: FfmpegLogLevel = value
            .parse()
            .map_err(|error: String| format!("unsupported --log-level: {error}"))?;
        clipmark::set_ffmpeg_log_level(parsed);
    } else if !global.verbose {
        clipmark::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    }

    Ok(())
}

/// Drives an indicatif bar from pipeline progress.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        match info.stage {
            PipelineStage::Scanning => {
                self.bar.set_length(info.total);
                self.bar.set_message("extracting");
            }
            PipelineStage::Assembly => self.bar.finish_with_message("done"),
            _ => {
                self.bar.set_position(info.current);
                if let Some(timestamp) = info.marker_timestamp {
                    self.bar.set_message(format!(
                        "{:?} at {}",
                        info.stage,
                        format_timestamp(timestamp)
                    ));
                }
            }
        }
    }
}

fn metadata_json(metadata: &MediaMetadata) -> Value {
    json!({
        "format": metadata.format,
        "duration_seconds": metadata.duration.as_secs_f64(),
        "video": metadata.video.as_ref().map(|video| json!({
            "width": video.width,
            "height": video.height,
            "fps": video.frames_per_second,
            "codec": video.codec,
        })),
        "audio": metadata.audio.as_ref().map(|audio| json!({
            "sample_rate": audio.sample_rate,
            "channels": audio.channels,
            "codec": audio.codec,
        })),
    })
}

fn report_json(report: &ProcessingReport) -> Value {
    json!({
        "html": report.html_path.display().to_string(),
        "media_dir": report.media_dir.display().to_string(),
        "cancelled": report.cancelled,
        "markers": report.results.iter().map(|result| json!({
            "ordinal": result.ordinal,
            "kind": result.marker.kind.to_string(),
            "timestamp": format_timestamp(result.marker.timestamp),
            "offset": result.marker.source_offset,
            "output": result.output_path.display().to_string(),
            "error": result.error.as_ref().map(ToString::to_string),
        })).collect::<Vec<_>>(),
        "malformed": report.malformed.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "warnings": report.warnings,
    })
}

fn scan_json(document: &Document) -> Value {
    let entries: Vec<Value> = document
        .segments()
        .iter()
        .filter_map(|segment| match segment {
            Segment::Marker { marker, .. } => Some(json!({
                "kind": marker.kind.to_string(),
                "timestamp": format_timestamp(marker.timestamp),
                "duration": marker.duration.map(format_timestamp),
                "align": marker.alignment.as_str(),
                "caption": marker.caption,
                "offset": marker.source_offset,
            })),
            Segment::Malformed { offset, error, .. } => Some(json!({
                "offset": offset,
                "error": error.to_string(),
            })),
            Segment::Text(_) => None,
        })
        .collect();
    json!({ "markers": entries, "warnings": document.warnings() })
}

fn print_metadata(metadata: &MediaMetadata) {
    println!("Format: {}", metadata.format);
    println!("Duration: {}", format_timestamp(metadata.duration));
    if let Some(video) = &metadata.video {
        println!(
            "Video: {}x{} @ {:.2} fps [{}]",
            video.width, video.height, video.frames_per_second, video.codec,
        );
    }
    if let Some(audio) = &metadata.audio {
        println!(
            "Audio: {} Hz, {} ch [{}]",
            audio.sample_rate, audio.channels, audio.codec,
        );
    }
}

fn print_warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

fn print_success(message: &str) {
    println!("{} {}", "success:".green().bold(), message.green());
}

fn ensure_parent_dir(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global)?;

    match cli.command {
        Commands::Build {
            document,
            video,
            out,
            image_format,
            duplicates,
            no_audio,
            crf,
            preset,
            title,
            html_name,
            progress,
            json,
            strict,
        } => {
            let image_format: ImageFormat = image_format.parse()?;
            let duplicates: DuplicatePolicy = duplicates.parse()?;

            let mut clip_options = ClipOptions::default().crf(crf).preset(preset);
            if no_audio {
                clip_options = clip_options.without_audio();
            }

            let mut html_options = HtmlOptions::default();
            if let Some(title) = title {
                html_options = html_options.title(title);
            }

            let mut options = PipelineOptions::new()
                .with_duplicate_policy(duplicates)
                .with_image_format(image_format)
                .with_clip_options(clip_options)
                .with_html_options(html_options);
            if let Some(name) = html_name {
                options = options.with_html_file_name(name);
            }
            if progress && !json {
                options = options.with_progress(Arc::new(BarProgress::new()?));
            }

            let report = Pipeline::new(options).run(&document, &video, &out)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
            } else {
                for warning in &report.warnings {
                    print_warning(warning);
                }
                for error in &report.malformed {
                    print_warning(&error.to_string());
                }
                for failure in report.failed() {
                    print_warning(&failure.to_string());
                }
                print_success(&format!(
                    "Wrote {} ({} of {} markers extracted into {})",
                    report.html_path.display(),
                    report.succeeded().count(),
                    report.results.len(),
                    report.media_dir.display()
                ));
            }

            if strict && !report.is_complete_success() {
                return Ok(EXIT_MARKERS_FAILED);
            }
        }
        Commands::Scan { document, json } => {
            let document = Document::read(&document, ScanOptions::default())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&scan_json(&document))?);
            } else {
                for segment in document.segments() {
                    match segment {
                        Segment::Marker { marker, .. } => {
                            let caption = marker.caption.as_deref().unwrap_or("");
                            println!("{marker} [{}] {caption}", marker.alignment);
                        }
                        Segment::Malformed { error, .. } => {
                            eprintln!("{} {error}", "invalid:".red().bold());
                        }
                        Segment::Text(_) => {}
                    }
                }
                for warning in document.warnings() {
                    print_warning(warning);
                }
                println!("{} marker(s)", document.markers().count());
            }
        }
        Commands::Probe { videos, json } => {
            let results = MediaProbe::probe_many(&videos);

            if let [single] = results.as_slice() {
                let metadata = single.as_ref().map_err(ToString::to_string)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&metadata_json(metadata))?);
                } else {
                    print_metadata(metadata);
                }
                return Ok(0);
            }

            let mut failures = 0;
            if json {
                let entries: Vec<Value> = videos
                    .iter()
                    .zip(&results)
                    .map(|(path, result)| match result {
                        Ok(metadata) => json!({
                            "path": path.display().to_string(),
                            "metadata": metadata_json(metadata),
                        }),
                        Err(error) => {
                            failures += 1;
                            json!({
                                "path": path.display().to_string(),
                                "error": error.to_string(),
                            })
                        }
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for (path, result) in videos.iter().zip(&results) {
                    println!("{}", path.display().to_string().bold());
                    match result {
                        Ok(metadata) => print_metadata(metadata),
                        Err(error) => {
                            failures += 1;
                            print_warning(&error.to_string());
                        }
                    }
                }
            }

            if failures > 0 {
                return Ok(1);
            }
        }
        Commands::Screenshot { video, at, out } => {
            let timestamp = parse_timestamp(&at)?;
            ensure_parent_dir(&out)?;
            let mut source = VideoSource::open(&video)?;
            source.screenshot().save_at(timestamp, &out)?;
            print_success(&format!(
                "Saved frame at {} to {}",
                format_timestamp(timestamp),
                out.display()
            ));
        }
        Commands::Clip {
            video,
            at,
            duration,
            out,
            no_audio,
            crf,
        } => {
            let start = parse_timestamp(&at)?;
            let length = parse_timestamp(&duration)?;
            let mut clip_options = ClipOptions::default().crf(crf);
            if no_audio {
                clip_options = clip_options.without_audio();
            }
            ensure_parent_dir(&out)?;
            let mut source = VideoSource::open(&video)?;
            ClipWriter::new(&mut source, clip_options).write(start, length, &out)?;
            print_success(&format!(
                "Saved {} clip from {} to {}",
                format_timestamp(length),
                format_timestamp(start),
                out.display()
            ));
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "clipmark", &mut std::io::stdout());
        }
    }

    Ok(0)
}

fn main() {
    match run() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}
