//! Display of transcript entries.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use manifest_core::{EntryContent, Transcript, TranscriptEntry};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ChatError;

/// Something that can show transcript entries to the user.
pub trait Render {
    fn render(&mut self, entry: &TranscriptEntry) -> Result<(), ChatError>;

    /// Called once a question is shown and its reply is pending.
    fn waiting(&mut self) -> Result<(), ChatError> {
        Ok(())
    }

    /// Show every entry in order.
    fn render_transcript(&mut self, transcript: &Transcript) -> Result<(), ChatError> {
        for entry in transcript.entries() {
            self.render(entry)?;
        }
        Ok(())
    }
}

/// Prints text entries to a writer and saves image entries as PNG files.
///
/// Each image is written once; rendering the same entry again reuses the
/// saved file.
pub struct TerminalRenderer<W: Write> {
    out: W,
    image_dir: PathBuf,
    saved: HashMap<Uuid, PathBuf>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            out,
            image_dir: image_dir.into(),
            saved: HashMap::new(),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn save_image(&mut self, id: Uuid, bytes: &[u8]) -> io::Result<PathBuf> {
        if let Some(path) = self.saved.get(&id) {
            return Ok(path.clone());
        }
        std::fs::create_dir_all(&self.image_dir)?;
        let path = self
            .image_dir
            .join(format!("visualization-{}.png", self.saved.len() + 1));
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "image saved");
        self.saved.insert(id, path.clone());
        Ok(path)
    }
}

impl<W: Write> Render for TerminalRenderer<W> {
    fn render(&mut self, entry: &TranscriptEntry) -> Result<(), ChatError> {
        let label = entry.role.as_str();
        match &entry.content {
            EntryContent::Text(text) => {
                writeln!(self.out, "{label}: {text}")?;
            }
            EntryContent::Image(image) => match self.save_image(entry.id, &image.bytes) {
                Ok(path) => writeln!(
                    self.out,
                    "{label}: [{}] {}x{} image saved to {}",
                    image.caption,
                    image.width,
                    image.height,
                    path.display()
                )?,
                Err(e) => {
                    warn!(
                        image_dir = %self.image_dir.display(),
                        error = %e,
                        "failed to save image"
                    );
                    writeln!(
                        self.out,
                        "{label}: [{}] {}x{} image could not be saved: {e}",
                        image.caption, image.width, image.height
                    )?;
                }
            },
        }
        self.out.flush()?;
        Ok(())
    }

    fn waiting(&mut self) -> Result<(), ChatError> {
        writeln!(self.out, "Thinking...")?;
        self.out.flush()?;
        Ok(())
    }
}
