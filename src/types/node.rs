use serde::{Deserialize, Serialize};

use crate::types::attributes::{Attributes, Comments, DEFAULT_LANGUAGE, preferred_comment};

/// Represents a node (ECU) in a CAN network.
///
/// A `Node` identifies a physical or logical unit that transmits or receives
/// messages. Message senders and signal receivers refer to nodes by name.
///
/// # Example
/// ```
/// use can_codec::Node;
///
/// let node = Node::new("Motor").with_comment("Controls engine-related functions");
///
/// assert_eq!(node.name, "Motor");
/// ```
#[derive(Default, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub name: String,
    /// Comments per language.
    #[serde(skip_serializing_if = "Comments::is_empty")]
    pub comments: Comments,
    pub attributes: Attributes,
}

impl Node {
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

    /// Clears all metadata from this `Node`.
    pub fn clear(&mut self) {
        *self = Node::default();
    }
}
