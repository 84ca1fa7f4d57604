//! §4.1 varint codec: 1/2/3/5-byte unsigned ints, ZigZag for signed.
//!
//! Ported from the reference C encoder/decoder (`_packU32`/`_unpackU32`,
//! `_zigZag32`/`_undoZigZag32`) one to one; only the byte-cursor plumbing is
//! idiomatic Rust.

use crate::{ByteReader, CoreError, CoreResult};

const PACK_1: u8 = 0x00;
const PACK_2: u8 = 0x40;
const PACK_3: u8 = 0x80;
const PACK_5: u8 = 0xC0;
const PACK_ANY: u8 = 0xC0;

/// Appends `n` to `out` as a §4.1 varint, using the minimum of
/// {1, 2, 3, 5} bytes.
pub fn pack_u32(n: u32, out: &mut crate::ByteWriter) {
    if n <= 0x3F {
        out.write_u8(n as u8);
    } else if n <= 0x3FFF {
        out.write_u8(PACK_2 | ((n >> 8) as u8));
        out.write_u8(n as u8);
    } else if n <= 0x003F_FFFF {
        out.write_u8(PACK_3 | ((n >> 16) as u8));
        out.write_u8((n >> 8) as u8);
        out.write_u8(n as u8);
    } else {
        out.write_u8(PACK_5);
        out.write_bytes(&n.to_be_bytes());
    }
}

/// Reads a §4.1 varint, inverting [`pack_u32`].
pub fn unpack_u32(r: &mut ByteReader<'_>) -> CoreResult<u32> {
    let lead = r.read_u8()?;
    let width_tag = lead & PACK_ANY;
    Ok(match width_tag {
        PACK_1 => u32::from(lead),
        PACK_2 => {
            let b1 = r.read_u8()?;
            (u32::from(lead & 0x3F) << 8) | u32::from(b1)
        }
        PACK_3 => {
            let b1 = r.read_u8()?;
            let b2 = r.read_u8()?;
            (u32::from(lead & 0x3F) << 16) | (u32::from(b1) << 8) | u32::from(b2)
        }
        _ => {
            if lead & 0x3F != 0 {
                return Err(CoreError::InvalidVarintPadding);
            }
            let rest = r.read_bytes(4)?;
            u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]])
        }
    })
}

/// ZigZag-encodes a signed 32-bit integer as an unsigned one, mapping small
/// magnitudes (positive or negative) to small unsigned values.
#[must_use]
pub fn zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverts [`zigzag32`].
#[must_use]
pub fn unzigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteWriter;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn roundtrip(n: u32) -> u32 {
        let mut w = ByteWriter::new();
        pack_u32(n, &mut w);
        let mut r = ByteReader::new(w.as_slice());
        unpack_u32(&mut r).unwrap()
    }

    #[test]
    fn widths_match_thresholds() {
        let mut w = ByteWriter::new();
        pack_u32(0x3F, &mut w);
        assert_eq!(w.len(), 1);

        let mut w = ByteWriter::new();
        pack_u32(0x40, &mut w);
        assert_eq!(w.len(), 2);

        let mut w = ByteWriter::new();
        pack_u32(0x3FFF, &mut w);
        assert_eq!(w.len(), 2);

        let mut w = ByteWriter::new();
        pack_u32(0x4000, &mut w);
        assert_eq!(w.len(), 3);

        let mut w = ByteWriter::new();
        pack_u32(0x003F_FFFF, &mut w);
        assert_eq!(w.len(), 3);

        let mut w = ByteWriter::new();
        pack_u32(0x0040_0000, &mut w);
        assert_eq!(w.len(), 5);

        let mut w = ByteWriter::new();
        pack_u32(u32::MAX, &mut w);
        assert_eq!(w.len(), 5);
    }

    #[test]
    fn zigzag_fixed_points() {
        assert_eq!(zigzag32(0), 0);
        assert_eq!(zigzag32(-1), 1);
        assert_eq!(unzigzag32(0), 0);
        assert_eq!(unzigzag32(1), -1);
    }

    #[test]
    fn rejects_nonzero_padding_in_5_byte_lead() {
        let mut w = ByteWriter::new();
        w.write_u8(PACK_5 | 0x01);
        w.write_bytes(&1u32.to_be_bytes());
        let mut r = ByteReader::new(w.as_slice());
        assert_eq!(unpack_u32(&mut r), Err(CoreError::InvalidVarintPadding));
    }

    proptest! {
        #[test]
        fn varint_law(n: u32) {
            prop_assert_eq!(roundtrip(n), n);
        }

        #[test]
        fn zigzag_law(n: i32) {
            prop_assert_eq!(unzigzag32(zigzag32(n)), n);
        }
    }
}
