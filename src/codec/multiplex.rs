//! Active signal selection for one frame instance.
//!
//! Every selector is read first, unconditionally: selector bit ranges never depend
//! on other selectors. A signal is then active iff each link of its constraint chain
//! (root selector first, see [`Message`]) holds for the observed raw selector values.
//! Inactive signals are absent from the frame, they are not "invalid".
//!
//! A nested selector is itself a gated signal: it is read to resolve the chains, but
//! only reported when its own chain holds. Its bits may belong to an active
//! alternative under another branch.

use crate::codec::options::EncodeOptions;
use crate::codec::signal::encode_physical;
use crate::core::bit_view::BitView;
use crate::types::errors::CodecError;
use crate::types::message::Message;
use crate::types::signal::Signal;
use crate::types::value::{SignalValues, Value};

/// Raw selector values observed for one decode / encode call.
#[derive(Clone, Debug)]
pub struct MultiplexResolver<'m> {
    message: &'m Message,
    // indexed like `message.signals()`, `Some` only for selectors with a known value
    selector_raw: Vec<Option<u64>>,
}

impl<'m> MultiplexResolver<'m> {
    /// Reads every selector of `message` from a payload.
    pub fn from_payload(message: &'m Message, view: &BitView<'_>) -> Result<Self, CodecError> {
        let mut selector_raw = vec![None; message.signals().len()];
        for &i in message.selectors() {
            let sig = &message.signals()[i];
            selector_raw[i] = Some(view.extract_steps(&sig.steps, sig.start, sig.length)?);
        }
        Ok(Self {
            message,
            selector_raw,
        })
    }

    /// Derives selector raw values from the values a caller wants to encode.
    ///
    /// Selectors are resolved root first. A nested selector whose own chain does not
    /// hold is not encoded and stays unknown, so a value supplied for it is treated
    /// like any other unselected key. A selector left out of `values` falls back to
    /// its `initial` value when the options allow it; otherwise it stays unknown and
    /// selects nothing.
    pub fn from_values(
        message: &'m Message,
        values: &SignalValues,
        options: &EncodeOptions,
    ) -> Result<Self, CodecError> {
        let mut resolver = Self {
            message,
            selector_raw: vec![None; message.signals().len()],
        };
        for &i in message.selectors() {
            if resolver.blocking_selector(i).is_some() {
                continue;
            }
            let sig = &message.signals()[i];
            resolver.selector_raw[i] = match values.get(&sig.name) {
                Some(value) => Some(encode_physical(sig, value, options)?),
                None => match sig.initial {
                    Some(initial) if options.defaults_from_initial() => {
                        Some(encode_physical(sig, &Value::Float(initial), options)?)
                    }
                    _ => None,
                },
            };
        }
        Ok(resolver)
    }

    /// Whether the full constraint chain of `signals[index]` holds.
    pub fn is_active(&self, index: usize) -> bool {
        self.blocking_selector(index).is_none()
    }

    /// Signals present in this frame instance, declaration order.
    pub fn active_signals(&self) -> impl Iterator<Item = (usize, &'m Signal)> + '_ {
        let signals: &'m [Signal] = self.message.signals();
        signals
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.is_active(*i))
    }

    /// Observed raw value of the selector called `name`.
    pub fn selector_value(&self, name: &str) -> Option<u64> {
        let i = self.message.signal_index(name)?;
        self.selector_raw.get(i).copied().flatten()
    }

    /// Name of the first selector on the chain of `signals[index]` that does not
    /// select it, `None` when the signal is active.
    pub fn blocking_selector(&self, index: usize) -> Option<&'m str> {
        let signals: &'m [Signal] = self.message.signals();
        self.message
            .mux_chain(index)
            .iter()
            .find(|link| match self.selector_raw[link.selector] {
                Some(raw) => !link.ids.iter().any(|sel| sel.contains(raw)),
                None => true,
            })
            .map(|link| signals[link.selector].name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bit_view::BitViewMut;
    use crate::types::message::Identifier;
    use crate::types::signal::{Endianness, MuxSelector};

    fn build_test_message() -> Message {
        // Mode selects group A (1) or group B (2); Sub is an extended selector in group A
        let mut ranged = Signal::new("Ranged", 40, 8);
        ranged.multiplexer_signal = Some("Mode".into());
        ranged.multiplexer_ids = vec![MuxSelector::Range { min: 1, max: 2 }];

        Message::new(
            "Muxed",
            Identifier::standard(0x200),
            8,
            vec![
                Signal::new("Mode", 0, 8).multiplexer(),
                Signal::new("Always", 8, 8),
                Signal::new("A1", 16, 8).multiplexed_by("Mode", [1]),
                Signal::new("Sub", 24, 4)
                    .multiplexer()
                    .multiplexed_by("Mode", [1]),
                Signal::new("A_Sub3", 32, 8).multiplexed_by("Sub", [3]),
                Signal::new("B1", 16, 16).multiplexed_by("Mode", [2]),
                ranged,
            ],
        )
        .unwrap()
    }

    fn active_names<'m>(resolver: &MultiplexResolver<'m>) -> Vec<&'m str> {
        resolver
            .active_signals()
            .map(|(_, s)| s.name.as_str())
            .collect()
    }

    fn payload(mode: u64, sub: u64) -> [u8; 8] {
        let mut data = [0u8; 8];
        let mut view = BitViewMut::new(&mut data);
        view.insert(0, 8, Endianness::Intel, mode).unwrap();
        view.insert(24, 4, Endianness::Intel, sub).unwrap();
        data
    }

    #[test]
    fn group_a_excludes_group_b() {
        let msg = build_test_message();
        let data = payload(1, 0);
        let resolver = MultiplexResolver::from_payload(&msg, &BitView::new(&data)).unwrap();
        assert_eq!(active_names(&resolver), vec!["Mode", "Always", "A1", "Sub", "Ranged"]);
        assert_eq!(resolver.selector_value("Mode"), Some(1));
    }

    #[test]
    fn group_b_excludes_group_a_and_its_nested_selector() {
        let msg = build_test_message();
        let data = payload(2, 3);
        let resolver = MultiplexResolver::from_payload(&msg, &BitView::new(&data)).unwrap();
        // Sub reads 3 but is itself inactive, so A_Sub3 stays out
        assert_eq!(active_names(&resolver), vec!["Mode", "Always", "B1", "Ranged"]);
        let a_sub3 = msg.signal_index("A_Sub3").unwrap();
        assert_eq!(resolver.blocking_selector(a_sub3), Some("Mode"));
    }

    #[test]
    fn nested_chain_must_hold_entirely() {
        let msg = build_test_message();
        let data = payload(1, 3);
        let resolver = MultiplexResolver::from_payload(&msg, &BitView::new(&data)).unwrap();
        assert_eq!(
            active_names(&resolver),
            vec!["Mode", "Always", "A1", "Sub", "A_Sub3", "Ranged"]
        );
    }

    #[test]
    fn unknown_selector_value_selects_nothing() {
        let msg = build_test_message();
        let data = payload(9, 3);
        let resolver = MultiplexResolver::from_payload(&msg, &BitView::new(&data)).unwrap();
        assert_eq!(active_names(&resolver), vec!["Mode", "Always"]);
    }

    #[test]
    fn selectors_from_values() {
        let msg = build_test_message();
        let mut values = SignalValues::new();
        values.insert("Mode".into(), Value::Integer(1));
        values.insert("Sub".into(), Value::Integer(3));
        let resolver =
            MultiplexResolver::from_values(&msg, &values, &EncodeOptions::default()).unwrap();
        assert_eq!(resolver.selector_value("Sub"), Some(3));
        assert!(resolver.is_active(msg.signal_index("A_Sub3").unwrap()));

        // Sub sits in branch Mode=1, so with Mode=2 its value is never looked at
        values.insert("Mode".into(), Value::Integer(2));
        values.insert("Sub".into(), Value::Integer(99));
        let resolver =
            MultiplexResolver::from_values(&msg, &values, &EncodeOptions::default()).unwrap();
        assert_eq!(resolver.selector_value("Sub"), None);
        assert_eq!(resolver.blocking_selector(msg.signal_index("Sub").unwrap()), Some("Mode"));

        // no selector value given: only unconditional signals remain
        let resolver =
            MultiplexResolver::from_values(&msg, &SignalValues::new(), &EncodeOptions::default())
                .unwrap();
        assert_eq!(active_names(&resolver), vec!["Mode", "Always"]);
    }

    #[test]
    fn selector_defaults_from_initial() {
        let signals = vec![
            Signal::new("Mode", 0, 8).multiplexer().with_initial(2.0),
            Signal::new("B", 8, 8).multiplexed_by("Mode", [2]),
        ];
        let msg = Message::new("M", Identifier::standard(1), 8, signals).unwrap();
        let strict =
            MultiplexResolver::from_values(&msg, &SignalValues::new(), &EncodeOptions::default())
                .unwrap();
        assert!(!strict.is_active(1));
        let lenient =
            MultiplexResolver::from_values(&msg, &SignalValues::new(), &EncodeOptions::lenient())
                .unwrap();
        assert!(lenient.is_active(1));
    }
}
