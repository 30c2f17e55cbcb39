//! # can_codec
//!
//! Rust model and codec for **automotive CAN** message definitions.
//!
//! ## Highlights
//! - **Bit-exact addressing**: [`BitView`] / [`BitViewMut`] read and write fields under both
//!   Intel (little-endian) and Motorola (big-endian) bit numbering.
//! - **Signal codec**: signed, unsigned and IEEE float fields, linear scaling, value tables,
//!   invalid sentinels and bounds checks (strict or clamping).
//! - **Multiplexing**: nested (extended) multiplexing resolved from precomputed constraint chains.
//! - **Containers**: CAN-FD container frames packed from / split into header-addressed records
//!   (feature `container`, on by default).
//! - **Stable keys**: the [`Database`] stores messages, nodes and buses in SlotMap arenas.
//!
//! ## Example
//! ```
//! use can_codec::{
//!     DecodeOptions, EncodeOptions, Endianness, Identifier, Message, Signal, SignalValues, Value,
//! };
//!
//! let msg = Message::new(
//!     "Coolant",
//!     Identifier::standard(0x3A0),
//!     2,
//!     vec![
//!         Signal::new("Temp", 7, 8)
//!             .with_byte_order(Endianness::Motorola)
//!             .with_scaling(0.1, 40.0)
//!             .with_choice(2, "Error"),
//!         Signal::new("Valid", 8, 1),
//!     ],
//! )
//! .unwrap();
//!
//! let mut values = SignalValues::new();
//! values.insert("Temp".into(), Value::Float(50.0));
//! values.insert("Valid".into(), Value::Integer(1));
//!
//! let data = msg.encode(&values, &EncodeOptions::default()).unwrap();
//! assert_eq!(data, vec![100, 0x01]);
//! assert_eq!(msg.decode(&data, &DecodeOptions::default()).unwrap(), values);
//! ```

pub mod codec;
pub mod core;
#[doc(hidden)]
pub mod types;

// Top-level re-exports (appear under Crate Items → Structs)
#[doc(inline)]
pub use crate::types::{
    attributes::{AttributeValue, Attributes, Comments, DEFAULT_LANGUAGE},
    bus::Bus,
    database::{BusKey, Database, MessageKey, NodeKey},
    errors::{CodecError, DatabaseError, LayoutError},
    message::{IdFormat, Identifier, Message, SignalTreeNode},
    node::Node,
    signal::{Choices, Endianness, MuxSelector, Signal},
    value::{NamedChoice, SignalValues, Value},
};

#[doc(inline)]
pub use crate::codec::{
    multiplex::MultiplexResolver,
    options::{DatabaseOptions, DecodeOptions, EncodeOptions},
    signal::{decode_raw, encode_physical},
};

#[cfg(feature = "container")]
#[doc(inline)]
pub use crate::codec::container::{ContainedInput, ContainedPayload};

pub use crate::core::bit_view::{BitView, BitViewMut};
