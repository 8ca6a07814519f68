use std::path::{Path, PathBuf};

use crate::error::Result;

/// A built-in example voice clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleClip {
    pub label: String,
    pub path: PathBuf,
}

/// List the `.wav`/`.mp3` clips in `dir`, sorted by file name.
///
/// Clips named `male_*` or `female_*` get a gender prefix in their label.
/// `*.tmp.wav` files are in-flight conversions and are skipped.
/// A missing directory yields an empty list.
pub fn discover_samples(dir: &Path) -> Result<Vec<SampleClip>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
        .filter(|name| name.ends_with(".wav") || name.ends_with(".mp3"))
        // Converted siblings of mp3 clips, not clips of their own.
        .filter(|name| !name.ends_with(".tmp.wav"))
        .collect();
    names.sort_unstable();

    Ok(names
        .into_iter()
        .map(|name| SampleClip {
            label: sample_label(&name),
            path: dir.join(&name),
        })
        .collect())
}

fn sample_label(file_name: &str) -> String {
    if file_name.starts_with("male_") {
        format!("Male - {file_name}")
    } else if file_name.starts_with("female_") {
        format!("Female - {file_name}")
    } else {
        file_name.to_string()
    }
}

/// Find a clip by label or by bare file name.
pub fn find_sample<'a>(samples: &'a [SampleClip], key: &str) -> Option<&'a SampleClip> {
    samples.iter().find(|clip| {
        clip.label == key || clip.path.file_name().and_then(|n| n.to_str()) == Some(key)
    })
}
