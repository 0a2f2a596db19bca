//! The scan, extract and assemble pipeline.
//!
//! [`Pipeline::run`] turns a marked-up document plus its source video into
//! an HTML page and a directory of media files. A failing marker never
//! aborts the run: it is rendered as a placeholder and recorded in the
//! [`ProcessingReport`].

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    configuration::PipelineOptions,
    document::{Document, read_document_text},
    error::ClipmarkError,
    extractor::{
        ExtractionResult, FfmpegExtractor, MarkerFailure, MediaExtractor, output_file_name,
    },
    html::HtmlAssembler,
    marker::{Marker, MarkerKind},
    progress::ProgressTracker,
};

/// Where a run writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Root output directory. The HTML file lives here.
    pub output_dir: PathBuf,
    /// Directory for screenshots and clips, inside `output_dir`.
    pub media_dir: PathBuf,
    /// Full path of the HTML file.
    pub html_path: PathBuf,
}

impl OutputLayout {
    /// Lay out `output_dir/<media_dir_name>/` and `output_dir/<html_file_name>`.
    pub fn new<P: AsRef<Path>>(output_dir: P, media_dir_name: &str, html_file_name: &str) -> Self {
        let output_dir = output_dir.as_ref().to_path_buf();
        Self {
            media_dir: output_dir.join(media_dir_name),
            html_path: output_dir.join(html_file_name),
            output_dir,
        }
    }

    /// Create the output and media directories if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ClipmarkError::FileAccess`] naming the directory that could
    /// not be created.
    pub fn create_dirs(&self) -> Result<(), ClipmarkError> {
        fs::create_dir_all(&self.media_dir).map_err(|error| ClipmarkError::FileAccess {
            path: self.media_dir.clone(),
            reason: error.to_string(),
        })
    }
}

/// Summary of a pipeline run.
#[derive(Debug)]
pub struct ProcessingReport {
    /// The written HTML page.
    pub html_path: PathBuf,
    /// Directory holding the extracted media.
    pub media_dir: PathBuf,
    /// One entry per marker, in document order.
    pub results: Vec<ExtractionResult>,
    /// Tags that looked like markers but could not be parsed.
    pub malformed: Vec<ClipmarkError>,
    /// Non-fatal scan warnings.
    pub warnings: Vec<String>,
    /// Whether the run was cancelled before every marker was processed.
    pub cancelled: bool,
}

impl ProcessingReport {
    /// Markers whose media was written.
    pub fn succeeded(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.iter().filter(|result| result.is_success())
    }

    /// Markers whose extraction failed or was cancelled, with context.
    pub fn failed(&self) -> impl Iterator<Item = MarkerFailure<'_>> {
        self.results.iter().filter_map(ExtractionResult::failure)
    }

    /// `true` when every marker parsed and extracted and nothing was
    /// cancelled.
    pub fn is_complete_success(&self) -> bool {
        !self.cancelled
            && self.malformed.is_empty()
            && self.results.iter().all(ExtractionResult::is_success)
    }
}

/// Runs documents through scanning, extraction and HTML assembly.
///
/// # Example
///
/// ```no_run
/// use clipmark::{Pipeline, PipelineOptions};
///
/// let report = Pipeline::new(PipelineOptions::default())
///     .run("post.md", "talk.mp4", "site")?;
///
/// println!("Wrote {}", report.html_path.display());
/// for failure in report.failed() {
///     eprintln!("{failure}");
/// }
/// # Ok::<(), clipmark::ClipmarkError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline with the given options.
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// The options this pipeline runs with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process `document_path` against `video_path`, writing into
    /// `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ClipmarkError::FileAccess`] if the document or the video
    /// cannot be read, or an output directory cannot be created. These are
    /// checked before anything is extracted. Per-marker failures are
    /// reported in the returned [`ProcessingReport`] instead.
    pub fn run<D, V, O>(
        &self,
        document_path: D,
        video_path: V,
        output_dir: O,
    ) -> Result<ProcessingReport, ClipmarkError>
    where
        D: AsRef<Path>,
        V: AsRef<Path>,
        O: AsRef<Path>,
    {
        let text = read_document_text(document_path)?;
        let mut extractor = FfmpegExtractor::open(video_path, self.options.clip.clone())?;

        let media_dir_name = self
            .options
            .media_dir_name
            .clone()
            .unwrap_or_else(|| extractor.source().stem());
        let layout = OutputLayout::new(output_dir, &media_dir_name, &self.options.html_file_name);

        self.run_with(&text, &mut extractor, &layout)
    }

    /// Process already-loaded `text` with any [`MediaExtractor`].
    ///
    /// # Errors
    ///
    /// Returns [`ClipmarkError::FileAccess`] if the output directories or the
    /// HTML file cannot be written.
    pub fn run_with<E: MediaExtractor>(
        &self,
        text: &str,
        extractor: &mut E,
        layout: &OutputLayout,
    ) -> Result<ProcessingReport, ClipmarkError> {
        layout.create_dirs()?;

        let document = Document::parse(text, self.options.scan.clone());
        let markers: Vec<&Marker> = document.markers().collect();
        let mut tracker =
            ProgressTracker::new(self.options.progress.clone(), markers.len() as u64);
        tracker.scanned();

        log::info!(
            "Found {} markers ({} malformed) in document",
            markers.len(),
            document.malformed().count()
        );

        let video_duration = extractor.video_duration();
        let mut results = Vec::with_capacity(markers.len());
        let mut cancelled = false;

        for (index, marker) in markers.into_iter().enumerate() {
            let ordinal = index + 1;
            let output_path = layout
                .media_dir
                .join(output_file_name(marker, ordinal, self.options.image_format));

            if !cancelled && self.options.is_cancelled() {
                log::warn!("Run cancelled before marker {ordinal}");
                cancelled = true;
            }

            let outcome = if cancelled {
                Err(ClipmarkError::Cancelled)
            } else {
                extract_marker(extractor, marker, video_duration, &output_path)
            };

            let result = ExtractionResult {
                marker: marker.clone(),
                ordinal,
                output_path,
                error: outcome.err(),
            };

            match result.failure() {
                Some(failure) if !cancelled => log::error!("{failure}"),
                Some(_) => {}
                None => log::debug!("Extracted {}", result.output_path.display()),
            }

            results.push(result);
            tracker.advance(marker);
        }

        let html = HtmlAssembler::new(self.options.html.clone())
            .with_base_dir(&layout.output_dir)
            .assemble(&document, &results);
        fs::write(&layout.html_path, html).map_err(|error| ClipmarkError::FileAccess {
            path: layout.html_path.clone(),
            reason: error.to_string(),
        })?;
        tracker.finish();

        let warnings = document.warnings().to_vec();
        let report = ProcessingReport {
            html_path: layout.html_path.clone(),
            media_dir: layout.media_dir.clone(),
            results,
            malformed: document.into_malformed(),
            warnings,
            cancelled,
        };

        log::info!(
            "Wrote {} ({} of {} markers extracted)",
            report.html_path.display(),
            report.succeeded().count(),
            report.results.len()
        );

        Ok(report)
    }
}

/// Bounds-check a marker against the video, then extract it.
fn extract_marker<E: MediaExtractor>(
    extractor: &mut E,
    marker: &Marker,
    video_duration: Duration,
    output_path: &Path,
) -> Result<(), ClipmarkError> {
    match marker.kind {
        MarkerKind::Screenshot => {
            if marker.timestamp > video_duration {
                return Err(ClipmarkError::SeekOutOfRange {
                    requested: marker.timestamp,
                    duration: video_duration,
                });
            }
            extractor.extract_screenshot(marker.timestamp, output_path)
        }
        MarkerKind::Clip => {
            let duration = marker.duration.unwrap_or(Duration::ZERO);
            if duration.is_zero() {
                return Err(ClipmarkError::InvalidDuration(duration));
            }
            if marker.end() > video_duration {
                return Err(ClipmarkError::SeekOutOfRange {
                    requested: marker.end(),
                    duration: video_duration,
                });
            }
            extractor.extract_clip(marker.timestamp, duration, output_path)
        }
    }
}
