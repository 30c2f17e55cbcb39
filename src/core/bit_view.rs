//! Bit-exact reads and writes over a frame payload.
//!
//! [`BitView`] reads, [`BitViewMut`] writes. Both address fields with the
//! `(start, length, byte_order)` triple of a signal:
//! - **Intel**: `start` is the LSB; the field grows towards higher bit numbers.
//! - **Motorola**: `start` is the MSB (bit 7 = MSB of byte 0); the field walks down to
//!   bit 0 of the byte, then continues at bit 7 of the next byte.
//!
//! Every addressed bit must lie inside the buffer, otherwise [`CodecError::Range`].

use crate::core::steps::{self, Step};
use crate::types::errors::{CodecError, LayoutError};
use crate::types::signal::Endianness;

/// Read-only bit view over a payload.
#[derive(Clone, Copy, Debug)]
pub struct BitView<'a> {
    bytes: &'a [u8],
}

impl<'a> BitView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Reads `length` bits starting at `start` and returns them as an unsigned raw value.
    ///
    /// # Example
    /// ```
    /// use can_codec::{BitView, Endianness};
    ///
    /// let view = BitView::new(&[0x01, 0x02]);
    /// assert_eq!(view.extract(7, 16, Endianness::Motorola).unwrap(), 0x0102);
    /// assert_eq!(view.extract(0, 16, Endianness::Intel).unwrap(), 0x0201);
    /// ```
    pub fn extract(&self, start: u16, length: u16, order: Endianness) -> Result<u64, CodecError> {
        check_length(length)?;
        let steps = steps::compile(start, length, order);
        self.extract_steps(&steps, start, length)
    }

    /// Extraction over precompiled steps (LSB-first accumulation).
    pub(crate) fn extract_steps(
        &self,
        steps: &[Step],
        start: u16,
        length: u16,
    ) -> Result<u64, CodecError> {
        check_range(steps, self.bytes.len(), start, length)?;

        let mut out: u64 = 0;
        for st in steps {
            let b = self.bytes[st.byte_index as usize];
            let chunk = ((b >> st.src_lsb) as u64) & steps::low_mask(st.width);
            out |= chunk << st.dst_lsb;
        }
        Ok(out)
    }
}

/// Mutable bit view over a payload.
#[derive(Debug)]
pub struct BitViewMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> BitViewMut<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_view(&self) -> BitView<'_> {
        BitView::new(self.bytes)
    }

    /// Writes the `length` low bits of `value` at the addressed field.
    ///
    /// Bits outside the field are left untouched. Nothing is written when the
    /// field does not fit the buffer.
    pub fn insert(
        &mut self,
        start: u16,
        length: u16,
        order: Endianness,
        value: u64,
    ) -> Result<(), CodecError> {
        check_length(length)?;
        let steps = steps::compile(start, length, order);
        self.insert_steps(&steps, start, length, value)
    }

    pub(crate) fn insert_steps(
        &mut self,
        steps: &[Step],
        start: u16,
        length: u16,
        value: u64,
    ) -> Result<(), CodecError> {
        check_range(steps, self.bytes.len(), start, length)?;

        for st in steps {
            let mask: u8 = st.byte_mask();
            let chunk: u8 = ((value >> st.dst_lsb) & steps::low_mask(st.width)) as u8;
            let byte = &mut self.bytes[st.byte_index as usize];
            *byte = (*byte & !mask) | ((chunk << st.src_lsb) & mask);
        }
        Ok(())
    }
}

fn check_length(length: u16) -> Result<(), CodecError> {
    if length == 0 {
        return Err(LayoutError::ZeroBitLength {
            signal: String::new(),
        }
        .into());
    }
    if length > 64 {
        return Err(LayoutError::BitLengthTooLong {
            signal: String::new(),
            length,
        }
        .into());
    }
    Ok(())
}

fn check_range(steps: &[Step], len: usize, start: u16, length: u16) -> Result<(), CodecError> {
    match steps::last_byte(steps) {
        Some(last) if last < len => Ok(()),
        _ => Err(CodecError::Range {
            start,
            length,
            buffer_bits: len * 8,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_decode_per_convention() {
        let data = [0x01u8, 0x02];
        let view = BitView::new(&data);
        assert_eq!(view.extract(7, 16, Endianness::Motorola).unwrap(), 0x0102);
        assert_eq!(view.extract(0, 16, Endianness::Intel).unwrap(), 0x0201);
    }

    #[test]
    fn extract_sub_byte_fields() {
        // 0b1011_0110
        let data = [0xB6u8];
        let view = BitView::new(&data);
        assert_eq!(view.extract(1, 3, Endianness::Intel).unwrap(), 0b011);
        assert_eq!(view.extract(7, 3, Endianness::Motorola).unwrap(), 0b101);
        assert_eq!(view.extract(4, 4, Endianness::Intel).unwrap(), 0xB);
    }

    #[test]
    fn motorola_crosses_byte_boundary() {
        // 12-bit field, MSB at bit 3 of byte 0: low nibble of byte 0 then byte 1
        let data = [0x0Au8, 0xBC];
        let view = BitView::new(&data);
        assert_eq!(view.extract(3, 12, Endianness::Motorola).unwrap(), 0xABC);
    }

    #[test]
    fn insert_then_extract_matches() {
        let mut data = [0u8; 8];
        let mut view = BitViewMut::new(&mut data);
        view.insert(3, 12, Endianness::Motorola, 0xABC).unwrap();
        view.insert(40, 20, Endianness::Intel, 0xF00D5).unwrap();
        let ro = view.as_view();
        assert_eq!(ro.extract(3, 12, Endianness::Motorola).unwrap(), 0xABC);
        assert_eq!(ro.extract(40, 20, Endianness::Intel).unwrap(), 0xF00D5);
        assert_eq!(data[0], 0x0A);
        assert_eq!(data[1], 0xBC);
    }

    #[test]
    fn insert_leaves_neighbour_bits_alone() {
        let mut data = [0xFFu8, 0xFF];
        BitViewMut::new(&mut data)
            .insert(4, 8, Endianness::Intel, 0x00)
            .unwrap();
        assert_eq!(data, [0x0F, 0xF0]);
    }

    #[test]
    fn insert_masks_value_to_length() {
        let mut data = [0u8; 2];
        BitViewMut::new(&mut data)
            .insert(0, 4, Endianness::Intel, 0xFFFF)
            .unwrap();
        assert_eq!(data, [0x0F, 0x00]);
    }

    #[test]
    fn out_of_buffer_is_range_error() {
        let mut data = [0u8; 2];
        let err = BitViewMut::new(&mut data)
            .insert(12, 8, Endianness::Intel, 1)
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::Range {
                start: 12,
                length: 8,
                buffer_bits: 16
            }
        );
        // nothing written
        assert_eq!(data, [0, 0]);

        let view = BitView::new(&[0u8; 1]);
        assert!(matches!(
            view.extract(7, 9, Endianness::Motorola),
            Err(CodecError::Range { .. })
        ));
    }

    #[test]
    fn bad_lengths_are_rejected() {
        let view = BitView::new(&[0u8; 8]);
        assert!(matches!(
            view.extract(0, 0, Endianness::Intel),
            Err(CodecError::Layout(LayoutError::ZeroBitLength { .. }))
        ));
        assert!(matches!(
            view.extract(0, 65, Endianness::Intel),
            Err(CodecError::Layout(LayoutError::BitLengthTooLong { length: 65, .. }))
        ));
    }

    #[test]
    fn full_64_bit_field() {
        let mut data = [0u8; 8];
        BitViewMut::new(&mut data)
            .insert(7, 64, Endianness::Motorola, 0x0102_0304_0506_0708)
            .unwrap();
        assert_eq!(data, [1, 2, 3, 4, 5, 6, 7, 8]);
        let view = BitView::new(&data);
        assert_eq!(
            view.extract(0, 64, Endianness::Intel).unwrap(),
            0x0807_0605_0403_0201
        );
    }
}
