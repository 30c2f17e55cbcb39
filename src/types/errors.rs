use thiserror::Error;

use crate::types::{database::MessageKey, message::Identifier};

/// Errors produced while verifying that a signal fits a CAN frame layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("Signal '{signal}': bit length cannot be zero")]
    ZeroBitLength { signal: String },
    #[error("Signal '{signal}': bit length {length} exceeds 64 bits")]
    BitLengthTooLong { signal: String, length: u16 },
    #[error("Signal '{signal}': float signals must be 32 or 64 bits long, got {length}")]
    InvalidFloatLength { signal: String, length: u16 },
    #[error(
        "Signal '{signal}' out of bounds! \nLast addressed byte = {last_byte} \nMessage length = {dlc} bytes"
    )]
    OutOfBounds {
        signal: String,
        last_byte: usize,
        dlc: u16,
    },
}

/// Errors returned while building a [`Database`](crate::Database) or looking things up in it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatabaseError {
    #[error("Node '{name}' already exists")]
    NodeAlreadyExists { name: String },
    #[error("Bus '{name}' already exists")]
    BusAlreadyExists { name: String },
    #[error("Message '{name}' already exists")]
    MessageAlreadyExists { name: String },
    #[error("{identifier} already assigned to message '{existing}'")]
    FrameIdAlreadyAssigned {
        identifier: Identifier,
        existing: String,
    },
    #[error("Header ID 0x{header_id:X} is used twice inside container '{container}'")]
    DuplicateHeaderId { header_id: u32, container: String },
    #[error("Message '{name}' not found")]
    MessageNotFound { name: String },
    #[error("No message with {identifier}")]
    FrameIdNotFound { identifier: Identifier },
    #[error("No contained message with header ID 0x{header_id:X}")]
    HeaderIdNotFound { header_id: u32 },
    #[error("Signal '{signal}' not found in message '{message}'")]
    SignalNotFound { message: String, signal: String },
    #[error("Node '{name}' not found")]
    NodeNotFound { name: String },
    #[error("Bus '{name}' not found")]
    BusNotFound { name: String },
    #[error("Stale message key {key:?}")]
    MessageMissing { key: MessageKey },
    #[error("Message '{message}' references unknown bus '{bus}'")]
    UnknownBus { message: String, bus: String },
    #[error("Message '{message}' references unknown node '{node}'")]
    UnknownNode { message: String, node: String },
    #[error("Signal '{signal}' is defined twice in message '{message}'")]
    DuplicateSignal { message: String, signal: String },
    #[error("Signal '{signal}' is multiplexed by unknown signal '{multiplexer}'")]
    UnknownMultiplexer { signal: String, multiplexer: String },
    #[error("Signal '{signal}' is multiplexed by '{multiplexer}', which is not a multiplexer")]
    NotAMultiplexer { signal: String, multiplexer: String },
    #[error("Multiplexer chain of signal '{signal}' loops back on itself")]
    MultiplexCycle { signal: String },
    #[error(
        "Signals '{first}' and '{second}' of message '{message}' overlap while both active"
    )]
    OverlappingSignals {
        message: String,
        first: String,
        second: String,
    },
    #[error("Message '{message}': identifier 0x{id:X} does not fit its identifier space")]
    InvalidFrameId { message: String, id: u32 },
    #[error("Message '{message}' needs exactly one of a frame ID or a header ID")]
    AmbiguousIdentifier { message: String },
    #[error("Container '{container}': contained message '{message}' has no header ID")]
    MissingHeaderId { container: String, message: String },
    #[error("Message '{message}': invalid payload length {length} bytes ({reason})")]
    InvalidLength {
        message: String,
        length: u16,
        reason: &'static str,
    },
    #[error("Message '{message}' is not a container message")]
    NotAContainer { message: String },
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Errors returned by the encode / decode entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("Bits {start}..+{length} fall outside a {buffer_bits}-bit buffer")]
    Range {
        start: u16,
        length: u16,
        buffer_bits: usize,
    },
    #[error("Message '{message}': expected {expected} payload bytes, got {actual}")]
    FrameLength {
        message: String,
        expected: usize,
        actual: usize,
    },
    #[error("Signal '{signal}': value {value} outside [{minimum}, {maximum}]")]
    OutOfRange {
        signal: String,
        value: f64,
        minimum: f64,
        maximum: f64,
    },
    #[error(
        "Signal '{signal}' is not selected by the current value of multiplexer '{multiplexer}'"
    )]
    InconsistentMultiplex { signal: String, multiplexer: String },
    #[error("Message '{message}': no value given for required signal '{signal}'")]
    MissingSignal { message: String, signal: String },
    #[error("Signal '{signal}' has no choice named '{label}'")]
    UnknownChoice { signal: String, label: String },
    #[error("Signal '{signal}' has no invalid value configured")]
    InvalidNotDefined { signal: String },
    #[error("Container '{message}': {length} bytes exceed the maximum of {maximum}")]
    ContainerOverflow {
        message: String,
        length: usize,
        maximum: usize,
    },
    #[error("Container '{message}': malformed record at byte {offset}")]
    MalformedContainer { message: String, offset: usize },
    #[error("Container '{message}': no contained message with header ID 0x{header_id:X}")]
    UnknownContainedMessage { message: String, header_id: u32 },
    #[error("Container '{message}': contained payload of {length} bytes does not fit a record")]
    ContainedPayloadTooLong { message: String, length: usize },
    #[error("Message '{message}' is not a container message")]
    NotAContainer { message: String },
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}
