//! Bit-level helpers shared by the model and the codec.

pub mod bit_view;
pub mod message_layout;
pub(crate) mod steps;
