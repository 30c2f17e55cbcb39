use serde::{Deserialize, Serialize};

use crate::types::attributes::{Comments, DEFAULT_LANGUAGE, preferred_comment};

/// A physical CAN bus and its bit timing.
///
/// Frame IDs only have to be unique per bus: two messages on different buses may
/// share an ID.
#[derive(Default, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Bus {
    pub name: String,
    /// Comments per language.
    #[serde(skip_serializing_if = "Comments::is_empty")]
    pub comments: Comments,
    /// Nominal (arbitration phase) bit rate in bit/s.
    pub baudrate: Option<u32>,
    /// CAN-FD data phase bit rate in bit/s.
    pub fd_baudrate: Option<u32>,
}

impl Bus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_comment(self, comment: impl Into<String>) -> Self {
        self.with_comment_in(DEFAULT_LANGUAGE, comment)
    }

    pub fn with_comment_in(
        mut self,
        language: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        self.comments.insert(language.into(), comment.into());
        self
    }

    pub fn comment(&self) -> Option<&str> {
        preferred_comment(&self.comments)
    }

    pub fn with_baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = Some(baudrate);
        self
    }

    pub fn with_fd_baudrate(mut self, fd_baudrate: u32) -> Self {
        self.fd_baudrate = Some(fd_baudrate);
        self
    }

    /// A bus is CAN-FD capable when it has a data phase bit rate.
    pub fn is_fd(&self) -> bool {
        self.fd_baudrate.is_some()
    }
}
