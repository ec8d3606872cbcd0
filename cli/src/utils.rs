use std::path::Path;

use anyhow::{Context as _, Result};
use takedown_business::{FileEntity, Payload};

/// Reads `path` into a new local attachment, guessing its content type from
/// the extension.
pub fn read_attachment(path: &Path) -> Result<FileEntity> {
    let name = path
        .file_name()
        .context("Invalid filename")?
        .to_string_lossy()
        .to_string();

    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    let data = std::fs::read(path).with_context(|| format!("Failed to read file: {path:?}"))?;

    Ok(FileEntity::local(
        &name,
        Payload::new(data, content_type.essence_str()),
    ))
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
