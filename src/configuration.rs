//! Run configuration.
//!
//! [`PipelineOptions`] is a builder that threads scan, extraction and HTML
//! settings plus progress callbacks and cancellation tokens through a
//! [`Pipeline`](crate::Pipeline) run without any global state.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use clipmark::{
//!     CancellationToken, DuplicatePolicy, ImageFormat, PipelineOptions, ProgressCallback,
//!     ProgressInfo,
//! };
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} done", info.stage, info.current);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = PipelineOptions::new()
//!     .with_duplicate_policy(DuplicatePolicy::Error)
//!     .with_image_format(ImageFormat::Png)
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// What to do when two markers of the same kind share a timestamp.
///
/// Re-using a timestamp is sometimes intended (the same frame shown twice
/// in a post), so the default only warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Accept silently.
    Allow,
    /// Accept, log a warning and record it in the report. This is the default.
    #[default]
    Warn,
    /// Reject the later marker with
    /// [`ClipmarkError::DuplicateTimestamp`](crate::ClipmarkError::DuplicateTimestamp).
    Error,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "allow" => Ok(DuplicatePolicy::Allow),
            "warn" | "warning" => Ok(DuplicatePolicy::Warn),
            "error" | "deny" => Ok(DuplicatePolicy::Error),
            other => Err(format!("unknown duplicate policy: {other} (allow, warn, error)")),
        }
    }
}

/// Marker scanning settings.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Handling of repeated timestamps.
    pub duplicate_policy: DuplicatePolicy,
}

impl ScanOptions {
    /// Set the duplicate-timestamp policy.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Still image format for screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// JPEG (`.jpg`). The default.
    #[default]
    Jpeg,
    /// PNG (`.png`).
    Png,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            other => Err(format!("unsupported image format: {other} (jpg, png)")),
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

/// Clip encoding settings.
///
/// Clips are re-encoded to H.264 in an MP4 container so every clip starts
/// on a keyframe and plays on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipOptions {
    /// Constant Rate Factor (0-51, lower is better). Default: 23.
    pub crf: u32,
    /// x264 speed preset. Default: `"veryfast"`.
    pub preset: String,
    /// Stream-copy the matching audio range. Default: `true`.
    pub include_audio: bool,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            crf: 23,
            preset: "veryfast".to_string(),
            include_audio: true,
        }
    }
}

impl ClipOptions {
    /// Set the CRF quality value (clamped to 51).
    #[must_use]
    pub fn crf(mut self, crf: u32) -> Self {
        self.crf = crf.min(51);
        self
    }

    /// Set the encoder preset.
    #[must_use]
    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Drop audio from generated clips.
    #[must_use]
    pub fn without_audio(mut self) -> Self {
        self.include_audio = false;
        self
    }
}

/// HTML output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Contents of the `<title>` element.
    pub title: String,
    /// Embed the default figure stylesheet in `<head>`.
    pub include_stylesheet: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            title: "Blog Post".to_string(),
            include_stylesheet: true,
        }
    }
}

impl HtmlOptions {
    /// Set the document title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Leave the stylesheet out of the generated page.
    #[must_use]
    pub fn without_stylesheet(mut self) -> Self {
        self.include_stylesheet = false;
        self
    }
}

/// Configuration for a [`Pipeline`](crate::Pipeline) run.
///
/// All fields have defaults; a default-constructed value scans with
/// [`DuplicatePolicy::Warn`], writes JPEG screenshots and H.264 clips into
/// a media directory named after the video, and writes `blog_post.html`.
#[derive(Clone)]
pub struct PipelineOptions {
    pub(crate) scan: ScanOptions,
    pub(crate) clip: ClipOptions,
    pub(crate) html: HtmlOptions,
    pub(crate) image_format: ImageFormat,
    /// Media sub-directory name. `None` uses the video file stem.
    pub(crate) media_dir_name: Option<String>,
    pub(crate) html_file_name: String,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for PipelineOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineOptions")
            .field("scan", &self.scan)
            .field("clip", &self.clip)
            .field("html", &self.html)
            .field("image_format", &self.image_format)
            .field("media_dir_name", &self.media_dir_name)
            .field("html_file_name", &self.html_file_name)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            scan: ScanOptions::default(),
            clip: ClipOptions::default(),
            html: HtmlOptions::default(),
            image_format: ImageFormat::default(),
            media_dir_name: None,
            html_file_name: "blog_post.html".to_string(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Set the duplicate-timestamp policy used while scanning.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.scan.duplicate_policy = policy;
        self
    }

    /// Replace the clip encoding settings.
    #[must_use]
    pub fn with_clip_options(mut self, clip: ClipOptions) -> Self {
        self.clip = clip;
        self
    }

    /// Replace the HTML settings.
    #[must_use]
    pub fn with_html_options(mut self, html: HtmlOptions) -> Self {
        self.html = html;
        self
    }

    /// Set the screenshot image format.
    #[must_use]
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Name the media sub-directory instead of deriving it from the video.
    #[must_use]
    pub fn with_media_dir_name(mut self, name: impl Into<String>) -> Self {
        self.media_dir_name = Some(name.into());
        self
    }

    /// Set the generated HTML file name.
    #[must_use]
    pub fn with_html_file_name(mut self, name: impl Into<String>) -> Self {
        self.html_file_name = name.into();
        self
    }

    /// Attach a progress callback, invoked once per processed marker.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked between marker extractions.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Scan settings.
    pub fn scan_options(&self) -> &ScanOptions {
        &self.scan
    }

    /// Clip encoding settings.
    pub fn clip_options(&self) -> &ClipOptions {
        &self.clip
    }

    /// HTML settings.
    pub fn html_options(&self) -> &HtmlOptions {
        &self.html
    }

    /// Screenshot image format.
    pub fn image_format(&self) -> ImageFormat {
        self.image_format
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
