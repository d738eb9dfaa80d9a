//! Append-only conversation log with durable JSON persistence.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;
use crate::types::{Conversation, Message, Role};

/// Ordered, append-only message log.
///
/// `append` is the only mutator. `snapshot` hands out an owned copy so no
/// caller can alter the log behind the owner's back.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Conversation,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation from the operating prompt.
    pub fn seeded(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn from_messages(messages: Conversation) -> Self {
        Self { messages }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn snapshot(&self) -> Conversation {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Role of the opening message; a well-formed log starts with `System`.
    pub fn first_role(&self) -> Option<Role> {
        self.messages.first().map(|m| m.role)
    }

    /// Write the full log to `path`, replacing any previous copy atomically.
    ///
    /// The JSON is written to a sibling temp file, synced, then renamed over
    /// the target, so a crash leaves either the old or the new file intact.
    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.messages).map_err(StoreError::Encode)?;
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp = temp_path(path);
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&tmp, path).map_err(io_err)?;

        debug!(path = %path.display(), messages = self.messages.len(), "conversation saved");
        Ok(())
    }

    /// Load a previously persisted log.
    pub fn restore(path: &Path) -> Result<Self, StoreError> {
        let raw = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let messages: Conversation =
            serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), messages = messages.len(), "conversation restored");
        Ok(Self { messages })
    }

    /// Delete the durable copy. A missing file counts as cleared.
    pub fn clear(path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "conversation".into());
    name.push(".tmp");
    path.with_file_name(name)
}
