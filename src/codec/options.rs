use serde::{Deserialize, Serialize};

/// Knobs for [`Message::decode`](crate::Message::decode).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Substitute value-table labels for raw values.
    pub decode_choices: bool,
    /// Apply `raw * scale + offset`. When off, values are the bare (sign-extended) raw integers.
    pub scaling: bool,
    /// Accept payloads shorter than the message length, zero-padding the missing bytes.
    pub allow_truncated: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            decode_choices: true,
            scaling: true,
            allow_truncated: false,
        }
    }
}

impl DecodeOptions {
    /// Raw diagnostic view: no choice substitution, no scaling.
    pub fn raw() -> Self {
        Self {
            decode_choices: false,
            scaling: false,
            allow_truncated: false,
        }
    }

    pub fn truncated(mut self) -> Self {
        self.allow_truncated = true;
        self
    }
}

/// Knobs for [`Message::encode`](crate::Message::encode).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Out-of-range values fail instead of being clamped; missing signals fail
    /// unless `use_initial` is set.
    pub strict: bool,
    /// Values are physical; when off they are taken as raw integers.
    pub scaling: bool,
    /// Fill missing required signals from their `initial` value.
    pub use_initial: bool,
    /// Treat values for signals outside the selected multiplex branch as errors.
    pub reject_unselected: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            strict: true,
            scaling: true,
            use_initial: false,
            reject_unselected: false,
        }
    }
}

impl EncodeOptions {
    /// Clamp instead of failing, default missing signals from `initial`.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Default::default()
        }
    }

    /// Whether missing signals may fall back to their `initial` value.
    pub(crate) fn defaults_from_initial(&self) -> bool {
        self.use_initial || !self.strict
    }
}

/// Validation policy applied by [`Database::add_message`](crate::Database::add_message).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Reject messages whose simultaneously active signals overlap.
    pub strict: bool,
    /// Allow several messages on one bus to share a frame ID.
    pub allow_frame_id_collisions: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            strict: true,
            allow_frame_id_collisions: false,
        }
    }
}
