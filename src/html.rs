//! HTML page assembly.
//!
//! [`HtmlAssembler`] walks a [`Document`] and replaces every marker with a
//! `<figure>` that references the extracted media file. Text between
//! markers is copied through unchanged, so a document without markers comes
//! out byte-identical inside the page shell.

use std::{
    collections::HashMap,
    fmt::Write as _,
    path::{Component, Path, PathBuf},
};

use crate::{
    configuration::HtmlOptions,
    document::{Document, Segment},
    extractor::ExtractionResult,
    marker::{Marker, MarkerKind},
    timestamp::format_timestamp,
};

/// Stylesheet embedded in the page `<head>` unless disabled.
pub const DEFAULT_STYLESHEET: &str = "\
figure.media {
    margin: 2em 0;
    text-align: center;
}
figure.media.align-left {
    text-align: left;
}
figure.media.align-right {
    text-align: right;
}
figure.media img, figure.media video {
    max-width: 100%;
    height: auto;
}
figure.media figcaption {
    color: #666;
    font-size: 0.9em;
    margin-top: 0.5em;
}
figure.media-error {
    border: 1px dashed #c00;
    padding: 1em;
}
figure.media-error figcaption {
    color: #c00;
}
";

/// Builds the output HTML page.
///
/// # Example
///
/// ```
/// use clipmark::{Document, HtmlAssembler, HtmlOptions, ScanOptions};
///
/// let document = Document::parse("No media here.", ScanOptions::default());
/// let html = HtmlAssembler::new(HtmlOptions::default()).assemble(&document, &[]);
///
/// assert!(html.contains("<article>\nNo media here.\n</article>"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct HtmlAssembler {
    options: HtmlOptions,
    base_dir: Option<PathBuf>,
}

impl HtmlAssembler {
    /// Create an assembler with the given options.
    pub fn new(options: HtmlOptions) -> Self {
        Self {
            options,
            base_dir: None,
        }
    }

    /// Directory the HTML file will be written to. Media paths are made
    /// relative to it; without one they are used as given.
    #[must_use]
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Render the full page for `document`.
    ///
    /// `results` are matched to markers by source offset. A marker without a
    /// result renders as a placeholder.
    pub fn assemble(&self, document: &Document, results: &[ExtractionResult]) -> String {
        self.wrap(&self.render_content(document, results))
    }

    /// Render the article body: text verbatim, markers as figures.
    pub fn render_content(&self, document: &Document, results: &[ExtractionResult]) -> String {
        let by_offset: HashMap<usize, &ExtractionResult> = results
            .iter()
            .map(|result| (result.marker.source_offset, result))
            .collect();

        let mut content = String::new();
        for segment in document.segments() {
            match segment {
                Segment::Text(text) => content.push_str(text),
                Segment::Marker { marker, .. } => {
                    match by_offset.get(&marker.source_offset) {
                        Some(result) => match &result.error {
                            None => content.push_str(&self.render_figure(result)),
                            Some(error) => content.push_str(&render_placeholder(
                                &missing_label(marker),
                                &error.to_string(),
                            )),
                        },
                        None => content.push_str(&render_placeholder(
                            &missing_label(marker),
                            "not extracted",
                        )),
                    }
                }
                Segment::Malformed { error, .. } => {
                    content.push_str(&render_placeholder("Invalid marker", &error.to_string()));
                }
            }
        }
        content
    }

    /// Wrap rendered content in the page shell.
    pub fn wrap(&self, content: &str) -> String {
        let mut page = String::with_capacity(content.len() + DEFAULT_STYLESHEET.len() + 256);
        page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        page.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        );
        let _ = writeln!(page, "<title>{}</title>", escape_html(&self.options.title));
        if self.options.include_stylesheet {
            page.push_str("<style>\n");
            page.push_str(DEFAULT_STYLESHEET);
            page.push_str("</style>\n");
        }
        page.push_str("</head>\n<body>\n<article>\n");
        page.push_str(content);
        page.push_str("\n</article>\n</body>\n</html>\n");
        page
    }

    /// Render the figure for a successful extraction.
    pub fn render_figure(&self, result: &ExtractionResult) -> String {
        let marker = &result.marker;
        let src = escape_html(&self.media_src(&result.output_path));
        let caption = marker.caption.as_deref().map(escape_html);

        let mut figure = format!(
            "<figure class=\"media align-{}\">\n",
            marker.alignment.as_str()
        );
        match marker.kind {
            MarkerKind::Screenshot => {
                let alt = caption.clone().unwrap_or_else(|| {
                    format!("Screenshot at {}", format_timestamp(marker.timestamp))
                });
                let _ = writeln!(figure, "<img src=\"{src}\" alt=\"{alt}\">");
            }
            MarkerKind::Clip => {
                figure.push_str("<video controls preload=\"metadata\">\n");
                let _ = writeln!(figure, "<source src=\"{src}\" type=\"video/mp4\">");
                figure.push_str("Your browser does not support the video tag.\n</video>\n");
            }
        }
        if let Some(caption) = caption {
            let _ = writeln!(figure, "<figcaption>{caption}</figcaption>");
        }
        figure.push_str("</figure>");
        figure
    }

    /// `src` value for a media file: relative to the base directory, with
    /// forward slashes.
    fn media_src(&self, path: &Path) -> String {
        let relative = self
            .base_dir
            .as_deref()
            .and_then(|base| path.strip_prefix(base).ok())
            .unwrap_or(path);

        relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                Component::RootDir => Some(String::new()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn missing_label(marker: &Marker) -> String {
    let kind = match marker.kind {
        MarkerKind::Clip => "Clip",
        MarkerKind::Screenshot => "Screenshot",
    };
    format!(
        "{kind} at {} (offset {}) unavailable",
        format_timestamp(marker.timestamp),
        marker.source_offset
    )
}

fn render_placeholder(label: &str, detail: &str) -> String {
    format!(
        "<figure class=\"media media-error\">\n<figcaption>{}: {}</figcaption>\n</figure>",
        escape_html(label),
        escape_html(detail)
    )
}

/// Escape text for use in HTML element content and quoted attributes.
///
/// ```
/// assert_eq!(
///     clipmark::escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
///     "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
/// );
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
