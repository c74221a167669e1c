use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::PromptError;

/// Text-file-backed system prompt. Loaded once at startup; `reload`
/// re-reads the same file on demand and swaps the text in only after the
/// read fully succeeds, so a failed reload keeps the previous prompt.
#[derive(Debug)]
pub struct PromptStore {
    path: PathBuf,
    text: String,
}

impl PromptStore {
    pub fn load(path: &Path) -> Result<Self, PromptError> {
        let text = read_prompt(path)?;
        debug!(path = %path.display(), len = text.len(), "loaded system prompt");
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }

    pub fn reload(&mut self) -> Result<(), PromptError> {
        match read_prompt(&self.path) {
            Ok(text) => {
                debug!(path = %self.path.display(), len = text.len(), "reloaded system prompt");
                self.text = text;
                Ok(())
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "prompt reload failed");
                Err(err)
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_prompt(path: &Path) -> Result<String, PromptError> {
    let raw = fs::read_to_string(path).map_err(|err| PromptError::Read {
        path: path.to_path_buf(),
        source: err,
    })?;
    let text = raw.trim();
    if text.is_empty() {
        return Err(PromptError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(text.to_string())
}
