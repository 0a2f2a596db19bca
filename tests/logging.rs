//! Log output tests.
//!
//! Installs a capturing logger, so this file keeps to a single test binary
//! of its own.

use std::sync::Mutex;

use clipmark::{Document, ScanOptions};
use log::{Level, Log, Metadata, Record};

struct Capture {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture {
    records: Mutex::new(Vec::new()),
};

#[test]
fn malformed_markers_are_logged_as_errors() {
    log::set_logger(&CAPTURE).expect("logger already set");
    log::set_max_level(log::LevelFilter::Trace);

    let text = r#"A [CLIP timestamp="5"] b [SCREENSHOT timestamp="7]oops[/SCREENSHOT]"#;
    let document = Document::parse(text, ScanOptions::default());
    assert_eq!(document.malformed().count(), 2);

    let records = CAPTURE.records.lock().unwrap();
    let errors: Vec<&String> = records
        .iter()
        .filter(|(level, _)| *level == Level::Error)
        .map(|(_, message)| message)
        .collect();

    assert_eq!(errors.len(), 2, "records: {records:?}");
    assert!(errors[0].contains("Malformed [CLIP] marker at offset 2"));
    assert!(errors[1].contains("unterminated attribute quote"));
}
