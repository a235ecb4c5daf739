//! The JSON document plugins receive on stdin.
//!
//! ```json
//! {"files": [{"filename": "/repo/a.txt", "name": "a.txt", "type": "modified",
//!             "diff": [[1, " ", "kept"], [2, "-", "old"], [2, "+", "new"]]}]}
//! ```

use serde::Serialize;

use crate::diff::{FileChangeRecord, LineRecord};
use crate::Result;

/// One `[line, marker, content]` triple.
#[derive(Debug, Serialize)]
struct PayloadLine<'a>(usize, char, &'a str);

impl<'a> From<&'a LineRecord> for PayloadLine<'a> {
    fn from(record: &'a LineRecord) -> Self {
        PayloadLine(record.line_number, record.tag.marker(), &record.content)
    }
}

#[derive(Debug, Serialize)]
struct PayloadFile<'a> {
    filename: String,
    name: &'a str,
    #[serde(rename = "type")]
    kind: Option<&'static str>,
    diff: Vec<PayloadLine<'a>>,
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    files: Vec<PayloadFile<'a>>,
}

/// Build the payload value for a set of file records.
pub fn build_payload(files: &[FileChangeRecord]) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(payload(files))?)
}

/// Encode the payload as the bytes written to each plugin.
pub fn encode_payload(files: &[FileChangeRecord]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&payload(files))?)
}

fn payload(files: &[FileChangeRecord]) -> Payload<'_> {
    Payload {
        files: files
            .iter()
            .map(|file| PayloadFile {
                filename: file.absolute_path.to_string_lossy().into_owned(),
                name: &file.name,
                kind: file.kind.as_str(),
                diff: file.diff.iter().map(PayloadLine::from).collect(),
            })
            .collect(),
    }
}
