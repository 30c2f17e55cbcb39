//! CAN-FD container frames.
//!
//! A container payload is a concatenation of records:
//!
//! ```text
//! | header_id (3 bytes, big-endian) | length (1 byte) | payload (length bytes) |
//! ```
//!
//! Decoding stops at the end of the data or at trailing all-zero padding.

use crate::codec::options::{DecodeOptions, EncodeOptions};
use crate::types::errors::CodecError;
use crate::types::message::Message;
use crate::types::value::SignalValues;

const HEADER_LEN: usize = 4;
const MAX_HEADER_ID: u32 = 0xFF_FFFF;
const MAX_RECORD_PAYLOAD: usize = u8::MAX as usize;

/// One record of a decoded container frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ContainedPayload {
    /// The header ID matched a contained message.
    Decoded { name: String, values: SignalValues },
    /// Unknown header ID: the record's bytes as they were.
    Unresolved(Vec<u8>),
}

/// One record to pack into a container frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ContainedInput {
    /// Signal values of the contained message with this header ID.
    Values(SignalValues),
    /// Pre-encoded bytes, written as-is.
    Raw(Vec<u8>),
}

impl Message {
    /// Splits a container payload into its `(header_id, record)` sequence.
    ///
    /// Records whose header ID is not in the catalogue come back as
    /// [`ContainedPayload::Unresolved`] instead of failing the whole frame.
    pub fn decode_container(
        &self,
        data: &[u8],
        options: &DecodeOptions,
    ) -> Result<Vec<(u32, ContainedPayload)>, CodecError> {
        if !self.is_container() {
            return Err(CodecError::NotAContainer {
                message: self.name.clone(),
            });
        }
        if data.len() > self.length() as usize {
            return Err(CodecError::FrameLength {
                message: self.name.clone(),
                expected: self.length() as usize,
                actual: data.len(),
            });
        }

        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset < data.len() {
            let rest = &data[offset..];
            if rest.iter().all(|&b| b == 0) {
                break;
            }
            if rest.len() < HEADER_LEN {
                return Err(CodecError::MalformedContainer {
                    message: self.name.clone(),
                    offset,
                });
            }
            let header_id = u32::from_be_bytes([0, rest[0], rest[1], rest[2]]);
            let len = rest[3] as usize;
            let Some(body) = rest.get(HEADER_LEN..HEADER_LEN + len) else {
                return Err(CodecError::MalformedContainer {
                    message: self.name.clone(),
                    offset,
                });
            };

            let payload = match self.get_contained_message_by_header_id(header_id) {
                Ok(inner) => ContainedPayload::Decoded {
                    name: inner.name.clone(),
                    values: inner.decode(body, options)?,
                },
                Err(_) => {
                    tracing::debug!(
                        "Container '{}': unresolved header ID 0x{:06X} ({} bytes)",
                        self.name,
                        header_id,
                        len
                    );
                    ContainedPayload::Unresolved(body.to_vec())
                }
            };
            records.push((header_id, payload));
            offset += HEADER_LEN + len;
        }
        Ok(records)
    }

    /// Packs `(header_id, record)` pairs into a container payload, in order.
    ///
    /// The result is as long as its records; it must not exceed the container's
    /// [`length`](Message::length).
    pub fn encode_container(
        &self,
        records: &[(u32, ContainedInput)],
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError> {
        if !self.is_container() {
            return Err(CodecError::NotAContainer {
                message: self.name.clone(),
            });
        }

        let mut data: Vec<u8> = Vec::with_capacity(self.length() as usize);
        for (header_id, input) in records {
            let encoded;
            let body: &[u8] = match input {
                ContainedInput::Values(values) => {
                    let inner = self
                        .get_contained_message_by_header_id(*header_id)
                        .map_err(|_| CodecError::UnknownContainedMessage {
                            message: self.name.clone(),
                            header_id: *header_id,
                        })?;
                    encoded = inner.encode(values, options)?;
                    &encoded
                }
                ContainedInput::Raw(bytes) => {
                    if *header_id > MAX_HEADER_ID {
                        return Err(CodecError::UnknownContainedMessage {
                            message: self.name.clone(),
                            header_id: *header_id,
                        });
                    }
                    bytes
                }
            };
            if body.len() > MAX_RECORD_PAYLOAD {
                return Err(CodecError::ContainedPayloadTooLong {
                    message: self.name.clone(),
                    length: body.len(),
                });
            }

            data.extend_from_slice(&header_id.to_be_bytes()[1..]);
            data.push(body.len() as u8);
            data.extend_from_slice(body);
        }

        if data.len() > self.length() as usize {
            return Err(CodecError::ContainerOverflow {
                message: self.name.clone(),
                length: data.len(),
                maximum: self.length() as usize,
            });
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::Identifier;
    use crate::types::signal::Signal;
    use crate::types::value::Value;

    fn build_test_container(length: u16) -> Message {
        let status = Message::new(
            "Status",
            Identifier::header(0x00_0101),
            2,
            vec![Signal::new("State", 0, 4), Signal::new("Level", 8, 8)],
        )
        .unwrap();
        let position = Message::new(
            "Position",
            Identifier::header(0x12_3456),
            4,
            vec![
                Signal::new("X", 0, 16).signed(),
                Signal::new("Y", 16, 16).signed(),
            ],
        )
        .unwrap();
        Message::container(
            "Container",
            Identifier::standard(0x300),
            length,
            vec![status, position],
        )
        .unwrap()
    }

    fn values(pairs: &[(&str, i64)]) -> SignalValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Integer(*v)))
            .collect()
    }

    #[test]
    fn round_trip_two_records() {
        let container = build_test_container(64);
        let status = values(&[("State", 3), ("Level", 200)]);
        let position = values(&[("X", -10), ("Y", 1234)]);
        let data = container
            .encode_container(
                &[
                    (0x12_3456, ContainedInput::Values(position.clone())),
                    (0x00_0101, ContainedInput::Values(status.clone())),
                ],
                &EncodeOptions::default(),
            )
            .unwrap();
        assert_eq!(data.len(), 4 + 4 + 4 + 2);
        assert_eq!(&data[..4], &[0x12, 0x34, 0x56, 0x04]);

        let decoded = container
            .decode_container(&data, &DecodeOptions::default())
            .unwrap();
        assert_eq!(
            decoded,
            vec![
                (
                    0x12_3456,
                    ContainedPayload::Decoded {
                        name: "Position".into(),
                        values: position
                    }
                ),
                (
                    0x00_0101,
                    ContainedPayload::Decoded {
                        name: "Status".into(),
                        values: status
                    }
                ),
            ]
        );
    }

    #[test]
    fn unknown_header_is_surfaced_raw() {
        let container = build_test_container(64);
        let data = container
            .encode_container(
                &[
                    (0xAB_CDEF, ContainedInput::Raw(vec![1, 2, 3])),
                    (0x00_0101, ContainedInput::Values(values(&[("State", 1), ("Level", 2)]))),
                ],
                &EncodeOptions::default(),
            )
            .unwrap();
        let decoded = container
            .decode_container(&data, &DecodeOptions::default())
            .unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0], (0xAB_CDEF, ContainedPayload::Unresolved(vec![1, 2, 3])));
        assert!(matches!(decoded[1].1, ContainedPayload::Decoded { .. }));
    }

    #[test]
    fn trailing_padding_is_skipped() {
        let container = build_test_container(16);
        let mut data = vec![0x00, 0x01, 0x01, 0x02, 0x05, 0x07];
        data.resize(16, 0);
        let decoded = container
            .decode_container(&data, &DecodeOptions::default())
            .unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(
            decoded[0].1,
            ContainedPayload::Decoded {
                name: "Status".into(),
                values: values(&[("State", 5), ("Level", 7)])
            }
        );
    }

    #[test]
    fn malformed_records() {
        let container = build_test_container(16);
        // declares 9 bytes, carries 2
        let err = container
            .decode_container(&[0x00, 0x01, 0x01, 0x09, 0x05, 0x07], &DecodeOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::MalformedContainer {
                message: "Container".into(),
                offset: 0
            }
        );
        // truncated header
        assert!(matches!(
            container.decode_container(&[0x00, 0x01], &DecodeOptions::default()),
            Err(CodecError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn overflow_and_unknown_ids() {
        let container = build_test_container(8);
        let err = container
            .encode_container(
                &[
                    (0x00_0101, ContainedInput::Values(values(&[("State", 1), ("Level", 2)]))),
                    (0x00_0101, ContainedInput::Values(values(&[("State", 1), ("Level", 2)]))),
                ],
                &EncodeOptions::default(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::ContainerOverflow {
                message: "Container".into(),
                length: 12,
                maximum: 8
            }
        );

        let err = container
            .encode_container(
                &[(0x99, ContainedInput::Values(SignalValues::new()))],
                &EncodeOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownContainedMessage { header_id: 0x99, .. }));

        let err = build_test_container(64)
            .encode_container(&[(0x99, ContainedInput::Raw(vec![0; 300]))], &EncodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, CodecError::ContainedPayloadTooLong { length: 300, .. }));
    }

    #[test]
    fn plain_messages_are_not_containers() {
        let plain = Message::new("Plain", Identifier::standard(1), 8, vec![]).unwrap();
        assert!(matches!(
            plain.decode_container(&[0u8; 8], &DecodeOptions::default()),
            Err(CodecError::NotAContainer { .. })
        ));
        assert!(matches!(
            plain.encode_container(&[], &EncodeOptions::default()),
            Err(CodecError::NotAContainer { .. })
        ));
    }
}
