//! Terminal output for the CLI.
//!
//! Pipeline events are rendered as they are routed; final results go through a
//! table or, with `--json`, as a single JSON document on stdout.

use std::fmt::Display;

use console::{Term, style};
use flume::Receiver;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use takedown_business::{Action, FileEntity, FileStatus};

use crate::utils::format_size;

/// Terminal output helper for consistent styled output.
#[derive(Clone)]
pub struct Output {
    term: Term,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper writing to stdout.
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Print a success message with a green checkmark.
    pub fn success(&self, message: impl Display) {
        drop(
            self.term
                .write_line(&format!("{} {}", style("✓").green().bold(), message)),
        );
    }

    /// Print an error message with a red X.
    pub fn error(&self, message: impl Display) {
        drop(
            self.term
                .write_line(&format!("{} {}", style("✗").red().bold(), message)),
        );
    }

    pub fn warning(&self, message: impl Display) {
        drop(
            self.term
                .write_line(&format!("{} {}", style("⚠").yellow().bold(), message)),
        );
    }

    pub fn info(&self, message: impl Display) {
        drop(
            self.term
                .write_line(&format!("{} {}", style("ℹ").blue().bold(), message)),
        );
    }

    /// Print a plain message without any prefix.
    pub fn print(&self, message: impl Display) {
        drop(self.term.write_line(&message.to_string()));
    }

    pub fn progress(&self, name: impl Display, progress: u8) {
        drop(self.term.write_line(&format!(
            "  {} {} {}",
            style("↑").cyan(),
            style(name).white(),
            style(format!("{progress:>3}%")).dim()
        )));
    }

    pub fn files(&self, files: &[FileEntity]) {
        if files.is_empty() {
            drop(self.term.write_line(&style("No files").dim().to_string()));
            return;
        }
        let rows = files.iter().map(FileRow::from);
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        self.print(table);
    }

    /// Prints routed events until the context drops its subscribers.
    pub async fn follow(self, events: Receiver<Action>) {
        while let Ok(action) = events.recv_async().await {
            self.event(&action);
        }
    }

    fn event(&self, action: &Action) {
        match action {
            Action::FileUpdated(file) => match file.status {
                FileStatus::Uploading { progress } => self.progress(file.name, progress),
                FileStatus::Error { error } => {
                    self.error(format!("{} failed ({})", file.name, describe_status(error)));
                }
                FileStatus::Local | FileStatus::Uploaded => {}
            },
            Action::FileSwapped { next, .. } => {
                self.success(format!("{} stored as #{}", next.name, next.id));
            }
            Action::FileAdded(file) => match file.error() {
                Some(error) => self.error(format!("#{} ({})", file.id, describe_status(error))),
                None => log::debug!("Fetched {}", file.id),
            },
            Action::DeleteComplete(file) => self.success(format!("Deleted #{}", file.id)),
            Action::DeleteError { file, error } => {
                self.error(format!("Could not delete #{}: {error}", file.id));
            }
            Action::AddFile(_)
            | Action::AddFiles(_)
            | Action::DeleteFile(_)
            | Action::NoticeAdded(_)
            | Action::NoticesAdded(_)
            | Action::DocumentUpdated(_)
            | Action::TokenSet(_) => {}
        }
    }
}

fn describe_status(status: u16) -> String {
    if status == 0 {
        "no response".to_owned()
    } else {
        format!("HTTP {status}")
    }
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    content_type: String,
    #[tabled(rename = "Size")]
    size: String,
}

impl From<&FileEntity> for FileRow {
    fn from(file: &FileEntity) -> Self {
        let status = match file.status {
            FileStatus::Local => "local".to_owned(),
            FileStatus::Uploading { progress } => format!("uploading {progress}%"),
            FileStatus::Uploaded => "uploaded".to_owned(),
            FileStatus::Error { error } => format!("error: {}", describe_status(error)),
        };
        Self {
            id: file.id.to_string(),
            name: file.name.to_string(),
            status,
            content_type: file
                .content_type
                .map(|t| t.to_string())
                .unwrap_or_default(),
            size: file.size.map(format_size).unwrap_or_default(),
        }
    }
}
