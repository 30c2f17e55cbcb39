//! Bit-field addressing.
//!
//! A signal's `(start, length, byte_order)` triple is compiled once into a short list of
//! [`Step`]s, each moving a contiguous run of bits between one payload byte and the
//! LSB-first accumulated raw value. Both extraction and insertion walk the same steps,
//! so the two byte-order conventions only differ in how the steps are laid out.

use crate::types::signal::Endianness;

/// Elementary step for moving a bit field between a payload and a raw value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Step {
    /// Source byte index.
    pub(crate) byte_index: u16,
    /// LSB within the source byte (0..7).
    pub(crate) src_lsb: u8,
    /// Number of bits to take (1..8).
    pub(crate) width: u8,
    /// Destination LSB in the final value (LSB-first).
    pub(crate) dst_lsb: u8,
}

impl Step {
    /// In-byte mask covered by this step.
    #[inline]
    pub(crate) fn byte_mask(&self) -> u8 {
        (low_mask(self.width) as u8) << self.src_lsb
    }
}

/// Precomputes bit → value steps for a field. `length` must already be in `1..=64`.
pub(crate) fn compile(start: u16, length: u16, order: Endianness) -> Vec<Step> {
    // ceil((bit_len + (bit_start % 8)) / 8)
    let n_steps: usize = (length as usize + (start as usize & 7)).div_ceil(8).max(1);
    let mut steps: Vec<Step> = Vec::with_capacity(n_steps);

    match order {
        Endianness::Intel => compile_intel(&mut steps, start, length),
        Endianness::Motorola => compile_motorola(&mut steps, start, length),
    }
    steps
}

/// Step compilation for little-endian (Intel) fields.
fn compile_intel(steps: &mut Vec<Step>, start: u16, length: u16) {
    let mut remaining: u16 = length;
    let mut bit: u32 = start as u32;
    let mut dst: u16 = 0;

    while remaining > 0 {
        let byte_idx: u16 = (bit / 8) as u16;
        let bit_off: u8 = (bit % 8) as u8;
        let avail: u8 = 8 - bit_off;
        let take: u8 = remaining.min(avail as u16) as u8;

        steps.push(Step {
            byte_index: byte_idx,
            src_lsb: bit_off,
            width: take,
            dst_lsb: dst as u8,
        });

        bit += take as u32;
        dst += take as u16;
        remaining -= take as u16;
    }
}

/// Step compilation for big-endian (Motorola) fields.
fn compile_motorola(steps: &mut Vec<Step>, start: u16, length: u16) {
    // The start bit is the MSB of the field, numbered LSB=0 inside its byte.
    // Walk towards bit 0, then continue at bit 7 of the next byte.
    let mut remaining: u16 = length;
    let mut byte: u16 = start / 8;
    let mut bit_msb: u8 = (start % 8) as u8;

    while remaining > 0 {
        let can_take: u16 = (bit_msb as u16 + 1).min(remaining);
        let src_lsb: u8 = bit_msb + 1 - can_take as u8;
        let dst_lsb: u16 = remaining - can_take;

        steps.push(Step {
            byte_index: byte,
            src_lsb,
            width: can_take as u8,
            dst_lsb: dst_lsb as u8,
        });

        remaining -= can_take;
        if src_lsb == 0 {
            byte += 1;
            bit_msb = 7;
        } else {
            bit_msb = src_lsb - 1;
        }
    }
}

/// Highest payload byte touched by a compiled field.
#[inline]
pub(crate) fn last_byte(steps: &[Step]) -> Option<usize> {
    steps.iter().map(|st| st.byte_index as usize).max()
}

/// Mask with the `width` low bits set (`width` in `0..=64`).
#[inline]
pub(crate) fn low_mask(width: u8) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
