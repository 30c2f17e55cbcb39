use crate::codec::multiplex::MultiplexResolver;
use crate::codec::options::{DecodeOptions, EncodeOptions};
use crate::codec::signal::{decode_raw, encode_physical};
use crate::core::bit_view::{BitView, BitViewMut};
use crate::types::errors::{CodecError, DatabaseError};
use crate::types::message::Message;
use crate::types::value::{SignalValues, Value};

impl Message {
    /// Decodes one frame payload into `signal name → value` for every signal active
    /// in this frame.
    ///
    /// The payload must be exactly [`length`](Message::length) bytes long; shorter
    /// payloads are zero-padded when `options.allow_truncated` is set.
    ///
    /// # Example
    /// ```
    /// use can_codec::{DecodeOptions, Endianness, Identifier, Message, Signal, Value};
    ///
    /// let msg = Message::new(
    ///     "Engine",
    ///     Identifier::standard(0x100),
    ///     2,
    ///     vec![Signal::new("Rpm", 7, 16).with_byte_order(Endianness::Motorola)],
    /// )
    /// .unwrap();
    ///
    /// let values = msg.decode(&[0x01, 0x02], &DecodeOptions::default()).unwrap();
    /// assert_eq!(values["Rpm"], Value::Integer(0x0102));
    /// ```
    pub fn decode(&self, data: &[u8], options: &DecodeOptions) -> Result<SignalValues, CodecError> {
        let expected = self.length() as usize;
        let padded: Vec<u8>;
        let payload: &[u8] = if data.len() == expected {
            data
        } else if data.len() < expected && options.allow_truncated {
            tracing::debug!(
                "Message '{}': zero-padding {}-byte payload to {} bytes",
                self.name,
                data.len(),
                expected
            );
            let mut buf = vec![0u8; expected];
            buf[..data.len()].copy_from_slice(data);
            padded = buf;
            &padded
        } else {
            return Err(CodecError::FrameLength {
                message: self.name.clone(),
                expected,
                actual: data.len(),
            });
        };

        let view = BitView::new(payload);
        let resolver = MultiplexResolver::from_payload(self, &view)?;

        let mut values = SignalValues::new();
        for (_, sig) in resolver.active_signals() {
            let raw = view.extract_steps(&sig.steps, sig.start, sig.length)?;
            let value = decode_raw(sig, raw, options);
            tracing::trace!("{}.{} = {} (raw 0x{:X})", self.name, sig.name, value, raw);
            values.insert(sig.name.clone(), value);
        }
        Ok(values)
    }

    /// Encodes `values` into a zero-initialized payload of [`length`](Message::length) bytes.
    ///
    /// Every signal active under the supplied selector values needs a value, unless
    /// its `initial` value may stand in (see [`EncodeOptions`]). Values for signals
    /// outside the selected branch are ignored unless `options.reject_unselected`.
    pub fn encode(
        &self,
        values: &SignalValues,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let resolver = MultiplexResolver::from_values(self, values, options)?;

        for name in values.keys() {
            let Some(index) = self.signal_index(name) else {
                if options.reject_unselected {
                    return Err(DatabaseError::SignalNotFound {
                        message: self.name.clone(),
                        signal: name.clone(),
                    }
                    .into());
                }
                tracing::trace!("{}: ignoring unknown signal '{}'", self.name, name);
                continue;
            };
            if let Some(selector) = resolver.blocking_selector(index) {
                if options.reject_unselected {
                    return Err(CodecError::InconsistentMultiplex {
                        signal: name.clone(),
                        multiplexer: selector.to_string(),
                    });
                }
                tracing::trace!(
                    "{}: ignoring '{}', not selected by '{}'",
                    self.name,
                    name,
                    selector
                );
            }
        }

        let mut data = vec![0u8; self.length() as usize];
        let mut view = BitViewMut::new(&mut data);
        for (_, sig) in resolver.active_signals() {
            let raw = match values.get(&sig.name) {
                Some(value) => encode_physical(sig, value, options)?,
                None => match sig.initial {
                    Some(initial) if options.defaults_from_initial() => {
                        tracing::debug!(
                            "{}: no value for '{}', using initial value {}",
                            self.name,
                            sig.name,
                            initial
                        );
                        encode_physical(sig, &Value::Float(initial), options)?
                    }
                    _ => {
                        return Err(CodecError::MissingSignal {
                            message: self.name.clone(),
                            signal: sig.name.clone(),
                        });
                    }
                },
            };
            tracing::trace!("{}.{} <- raw 0x{:X}", self.name, sig.name, raw);
            view.insert_steps(&sig.steps, sig.start, sig.length, raw)?;
        }
        Ok(data)
    }
}
