use std::path::Path;

use crate::error::Result;

/// A single SRT cue covering the first ten seconds with the whole text.
///
/// There is no alignment: every output gets the same placeholder window.
pub fn placeholder_cue(text: &str) -> String {
    format!("1\n00:00:00,000 --> 00:00:10,000\n{}\n", text.trim())
}

pub fn write_placeholder(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, placeholder_cue(text))?;
    Ok(())
}
