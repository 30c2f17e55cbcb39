use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::steps::{self, Step};
use crate::types::{
    attributes::{Attributes, Comments, DEFAULT_LANGUAGE, preferred_comment},
    errors::LayoutError,
    value::NamedChoice,
};

/// Value table of a signal: raw (pre-scaling) integer → named choice.
pub type Choices = BTreeMap<i64, NamedChoice>;

/// Definition of a signal within a CAN message.
///
/// Describes position/bit-length, byte order, sign and float encoding, scaling
/// (`physical = raw * scale + offset`), advisory range, unit, value table, the
/// optional initial/invalid sentinels and its multiplexing role.
///
/// # Example
/// ```
/// use can_codec::{Endianness, Signal};
///
/// let sig = Signal::new("Coolant", 7, 16)
///     .with_byte_order(Endianness::Motorola)
///     .with_scaling(0.1, 40.0)
///     .with_limits(-40.0, 215.0)
///     .with_unit("degC");
/// assert_eq!(sig.scale, 0.1);
/// assert!(!sig.is_signed);
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Signal {
    /// Signal name, unique within its message.
    pub name: String,
    /// Start bit: LSB for Intel, MSB for Motorola.
    pub start: u16,
    /// Bit length (1..=64).
    pub length: u16,
    pub byte_order: Endianness,
    pub is_signed: bool,
    /// IEEE-754 single (32 bits) or double (64 bits).
    pub is_float: bool,
    /// Scaling factor.
    pub scale: f64,
    /// Scaling offset.
    pub offset: f64,
    /// Minimum physical value.
    pub minimum: Option<f64>,
    /// Maximum physical value.
    pub maximum: Option<f64>,
    pub unit: Option<String>,
    pub choices: Choices,
    /// Physical value used when an encode request leaves the signal out.
    pub initial: Option<f64>,
    /// Physical value that marks the signal as invalid on the bus.
    pub invalid: Option<f64>,
    /// This signal selects among alternative signal sets.
    pub is_multiplexer: bool,
    /// The selector controlling this signal's presence (`None` if unconditional).
    pub multiplexer_signal: Option<String>,
    /// Raw selector values for which this signal is present.
    pub multiplexer_ids: Vec<MuxSelector>,
    /// Receiver nodes.
    pub receivers: Vec<String>,
    /// Comments per language.
    #[serde(skip_serializing_if = "Comments::is_empty")]
    pub comments: Comments,
    pub attributes: Attributes,
    // Precomputed steps for fast extraction/insertion.
    #[serde(skip)]
    pub(crate) steps: Vec<Step>,
}

impl Default for Signal {
    fn default() -> Self {
        Self {
            name: String::new(),
            start: 0,
            length: 1,
            byte_order: Endianness::Intel,
            is_signed: false,
            is_float: false,
            scale: 1.0,
            offset: 0.0,
            minimum: None,
            maximum: None,
            unit: None,
            choices: Choices::new(),
            initial: None,
            invalid: None,
            is_multiplexer: false,
            multiplexer_signal: None,
            multiplexer_ids: Vec::new(),
            receivers: Vec::new(),
            comments: Comments::new(),
            attributes: Attributes::new(),
            steps: Vec::new(),
        }
    }
}

impl Signal {
    /// Unsigned, unscaled Intel signal.
    pub fn new(name: impl Into<String>, start: u16, length: u16) -> Self {
        Self {
            name: name.into(),
            start,
            length,
            ..Default::default()
        }
    }

    pub fn with_byte_order(mut self, byte_order: Endianness) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn signed(mut self) -> Self {
        self.is_signed = true;
        self
    }

    /// IEEE float encoding; the signal length selects single or double precision.
    pub fn float(mut self) -> Self {
        self.is_float = true;
        self
    }

    pub fn with_scaling(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    pub fn with_limits(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_choice(mut self, raw: i64, label: impl Into<String>) -> Self {
        self.choices.insert(raw, NamedChoice::new(raw, label));
        self
    }

    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn with_invalid(mut self, invalid: f64) -> Self {
        self.invalid = Some(invalid);
        self
    }

    /// Marks this signal as a selector.
    pub fn multiplexer(mut self) -> Self {
        self.is_multiplexer = true;
        self
    }

    /// Makes this signal present only while `selector` holds one of `ids`.
    pub fn multiplexed_by(
        mut self,
        selector: impl Into<String>,
        ids: impl IntoIterator<Item = u64>,
    ) -> Self {
        self.multiplexer_signal = Some(selector.into());
        self.multiplexer_ids = ids.into_iter().map(MuxSelector::Value).collect();
        self
    }

    pub fn with_receivers<I, S>(mut self, receivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.receivers = receivers.into_iter().map(Into::into).collect();
        self
    }

    /// Comment in the default language (see [`DEFAULT_LANGUAGE`]).
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

    /// The default-language comment, else any other one.
    pub fn comment(&self) -> Option<&str> {
        preferred_comment(&self.comments)
    }

    /// Validates the bit geometry and precomputes extraction steps.
    ///
    /// Called by [`Message`](crate::Message) construction; recompiles on every call so a
    /// signal edited before being handed to a message is never stale.
    pub fn compile_inline(&mut self) -> Result<(), LayoutError> {
        if self.length == 0 {
            return Err(LayoutError::ZeroBitLength {
                signal: self.name.clone(),
            });
        }
        if self.length > 64 {
            return Err(LayoutError::BitLengthTooLong {
                signal: self.name.clone(),
                length: self.length,
            });
        }
        if self.is_float && self.length != 32 && self.length != 64 {
            return Err(LayoutError::InvalidFloatLength {
                signal: self.name.clone(),
                length: self.length,
            });
        }
        self.steps = steps::compile(self.start, self.length, self.byte_order);
        Ok(())
    }

    /// Highest payload byte this signal touches.
    pub fn last_byte(&self) -> usize {
        match steps::last_byte(&self.steps) {
            Some(b) => b,
            None => steps::last_byte(&steps::compile(self.start, self.length, self.byte_order))
                .unwrap_or(0),
        }
    }

    /// Per-byte mask of the bits this signal occupies in a `dlc`-byte payload.
    pub(crate) fn byte_masks(&self, dlc: usize) -> Vec<u8> {
        let mut masks = vec![0u8; dlc];
        for st in &self.steps {
            if let Some(m) = masks.get_mut(st.byte_index as usize) {
                *m |= st.byte_mask();
            }
        }
        masks
    }

    /// Representable raw range `(min, max)` for this signal's integer encoding.
    pub fn raw_limits(&self) -> (i128, i128) {
        let n = self.length.clamp(1, 64) as u32;
        if self.is_signed {
            (-(1i128 << (n - 1)), (1i128 << (n - 1)) - 1)
        } else {
            (0, (1i128 << n) - 1)
        }
    }

    /// Looks a value-table entry up by its label (exact match).
    pub fn choice_by_label(&self, label: &str) -> Option<&NamedChoice> {
        self.choices.values().find(|c| c.label == label)
    }

    /// Whether this signal selects among alternative signal sets.
    pub fn is_selector(&self) -> bool {
        self.is_multiplexer
    }

    /// Whether `raw` is among this signal's selector ids.
    pub fn is_selected_by(&self, raw: u64) -> bool {
        self.multiplexer_ids.iter().any(|sel| sel.contains(raw))
    }

    /// Receiver lookup (case-insensitive).
    pub fn has_receiver(&self, name: &str) -> bool {
        self.receivers.iter().any(|r| r.eq_ignore_ascii_case(name))
    }

    /// Whether the signal applies linear scaling at all.
    #[inline]
    pub(crate) fn is_identity_scaling(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}

/// Bit-numbering convention of a signal.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Endianness {
    /// Big-endian: start bit is the MSB.
    Motorola,
    /// Little-endian: start bit is the LSB.
    #[default]
    Intel,
}

/// A selector for multiplexed signals: either a single value or a closed range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MuxSelector {
    /// Active only when the switch == value.
    Value(u64),
    /// Active only when min <= switch <= max.
    Range { min: u64, max: u64 },
}

impl MuxSelector {
    #[inline]
    pub fn contains(&self, raw: u64) -> bool {
        match *self {
            MuxSelector::Value(v) => v == raw,
            MuxSelector::Range { min, max } => (min..=max).contains(&raw),
        }
    }

    /// Whether two selectors can never hold at the same time.
    pub(crate) fn disjoint(&self, other: &MuxSelector) -> bool {
        let (a0, a1) = self.bounds();
        let (b0, b1) = other.bounds();
        a1 < b0 || b1 < a0
    }

    fn bounds(&self) -> (u64, u64) {
        match *self {
            MuxSelector::Value(v) => (v, v),
            MuxSelector::Range { min, max } => (min, max),
        }
    }

    /// Smallest raw value accepted by this selector.
    pub fn first(&self) -> u64 {
        self.bounds().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_test_signal() -> Signal {
        Signal::new("Speed", 0, 16)
            .with_scaling(0.01, 0.0)
            .with_limits(0.0, 250.0)
            .with_unit("km/h")
            .with_choice(0xFFFF, "SNA")
            .with_receivers(["Gateway", "Motor"])
            .with_comment("Vehicle speed")
    }

    #[test]
    fn defaults_are_unscaled_intel_unsigned() {
        let sig = Signal::default();
        assert_eq!(sig.scale, 1.0);
        assert_eq!(sig.offset, 0.0);
        assert_eq!(sig.byte_order, Endianness::Intel);
        assert!(sig.is_identity_scaling());
        assert!(sig.minimum.is_none());
    }

    #[test]
    fn compile_rejects_bad_geometry() {
        let mut sig = Signal::new("Zero", 0, 0);
        assert!(matches!(
            sig.compile_inline(),
            Err(LayoutError::ZeroBitLength { .. })
        ));

        let mut sig = Signal::new("Huge", 0, 65);
        assert!(matches!(
            sig.compile_inline(),
            Err(LayoutError::BitLengthTooLong { length: 65, .. })
        ));

        let mut sig = Signal::new("Half", 0, 16).float();
        assert!(matches!(
            sig.compile_inline(),
            Err(LayoutError::InvalidFloatLength { length: 16, .. })
        ));

        let mut sig = Signal::new("Single", 0, 32).float();
        assert!(sig.compile_inline().is_ok());
        assert_eq!(sig.steps.len(), 4);
    }

    #[test]
    fn raw_limits_per_sign() {
        assert_eq!(Signal::new("u8", 0, 8).raw_limits(), (0, 255));
        assert_eq!(Signal::new("i8", 0, 8).signed().raw_limits(), (-128, 127));
        assert_eq!(
            Signal::new("u64", 0, 64).raw_limits(),
            (0, u64::MAX as i128)
        );
    }

    #[test]
    fn lookups() {
        let sig = build_test_signal();
        assert_eq!(sig.choice_by_label("SNA").map(|c| c.raw), Some(0xFFFF));
        assert!(sig.choice_by_label("sna").is_none());
        assert!(sig.has_receiver("gateway"));
        assert!(!sig.has_receiver("FakeECU"));
        assert_eq!(sig.comment(), Some("Vehicle speed"));
        assert_eq!(sig.comments.get(DEFAULT_LANGUAGE).map(String::as_str), Some("Vehicle speed"));
    }

    #[test]
    fn selectors() {
        let sig = Signal::new("A", 8, 8).multiplexed_by("Mux", [1, 3]);
        assert!(!sig.is_selector());
        assert!(Signal::new("Mux", 0, 8).multiplexer().is_selector());
        assert!(sig.is_selected_by(1));
        assert!(sig.is_selected_by(3));
        assert!(!sig.is_selected_by(2));

        let range = MuxSelector::Range { min: 4, max: 7 };
        assert!(range.contains(5));
        assert!(!range.contains(8));
        assert!(range.disjoint(&MuxSelector::Value(8)));
        assert!(!range.disjoint(&MuxSelector::Range { min: 7, max: 9 }));
    }

    #[test]
    fn byte_masks_cover_signal_bits() {
        let mut sig = Signal::new("Nibble", 3, 8).with_byte_order(Endianness::Motorola);
        sig.compile_inline().unwrap();
        assert_eq!(sig.byte_masks(2), vec![0x0F, 0xF0]);
        assert_eq!(sig.last_byte(), 1);
    }
}
