//! # codec
//!
//! Conversion between frame payloads and signal values:
//! [`signal`] handles one field, [`multiplex`] picks the signals present in a frame,
//! [`message`] drives both over a whole payload and [`container`] splits CAN-FD
//! container frames into their records.

#[cfg(feature = "container")]
pub mod container;
pub mod message;
pub mod multiplex;
pub mod options;
pub mod signal;
