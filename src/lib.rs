//! # clipmark
//!
//! Turn a marked-up blog draft and its source video into an HTML page with
//! embedded screenshots and clips.
//!
//! Authors place inline markers in plain text:
//!
//! ```text
//! The demo starts with the login screen.
//! [SCREENSHOT timestamp="00:42" align="left"]The login form[/SCREENSHOT]
//! Then the whole flow, start to finish:
//! [CLIP timestamp="1:30" duration="30"]Checkout in thirty seconds[/CLIP]
//! ```
//!
//! `clipmark` finds the markers, extracts the matching frames and video
//! ranges with FFmpeg (via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)), and writes a page
//! where each marker has become a `<figure>`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clipmark::{Pipeline, PipelineOptions};
//!
//! let report = Pipeline::new(PipelineOptions::default())
//!     .run("post.txt", "talk.mp4", "site")?;
//!
//! println!(
//!     "{} written, {} of {} markers extracted",
//!     report.html_path.display(),
//!     report.succeeded().count(),
//!     report.results.len(),
//! );
//! # Ok::<(), clipmark::ClipmarkError>(())
//! ```
//!
//! ### Scanning only
//!
//! ```
//! use clipmark::{MarkerKind, MarkerScanner, ScanOptions};
//!
//! let text = r#"Intro [SCREENSHOT timestamp="5"] outro"#;
//! let markers: Vec<_> = MarkerScanner::new(text, ScanOptions::default())
//!     .collect::<Result<_, _>>()?;
//!
//! assert_eq!(markers[0].kind, MarkerKind::Screenshot);
//! # Ok::<(), clipmark::ClipmarkError>(())
//! ```
//!
//! ## Features
//!
//! - **Marker scanning**: lazy, in document order, with per-tag errors and
//!   a configurable policy for repeated timestamps
//! - **Screenshots**: seek to the nearest keyframe, decode forward to the
//!   exact frame, save as JPEG or PNG
//! - **Clips**: re-encoded H.264 MP4 with the matching audio range copied
//! - **Partial success**: failing markers become visible placeholders and
//!   are listed in the [`ProcessingReport`]
//! - **Progress & cancellation**: [`ProgressCallback`] observers and a
//!   [`CancellationToken`] checked between markers
//!
//! ## Requirements
//!
//! FFmpeg development libraries (with an H.264 encoder such as libx264) must
//! be installed on your system.

pub mod clip;
pub mod configuration;
mod conversion;
pub mod document;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod html;
pub mod marker;
pub mod metadata;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod scanner;
pub mod screenshot;
pub mod source;
pub mod timestamp;

pub use clip::ClipWriter;
pub use configuration::{
    ClipOptions, DuplicatePolicy, HtmlOptions, ImageFormat, PipelineOptions, ScanOptions,
};
pub use document::{Document, Segment, read_document_text};
pub use error::ClipmarkError;
pub use extractor::{
    ExtractionResult, FfmpegExtractor, MarkerFailure, MediaExtractor, output_file_name,
};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use html::{DEFAULT_STYLESHEET, HtmlAssembler, escape_html};
pub use marker::{Alignment, Marker, MarkerKind};
pub use metadata::{AudioMetadata, MediaMetadata, VideoMetadata};
pub use pipeline::{OutputLayout, Pipeline, ProcessingReport};
pub use probe::MediaProbe;
pub use progress::{CancellationToken, PipelineStage, ProgressCallback, ProgressInfo};
pub use scanner::MarkerScanner;
pub use screenshot::ScreenshotHandle;
pub use source::VideoSource;
pub use timestamp::{filename_timestamp, format_timestamp, parse_timestamp};
