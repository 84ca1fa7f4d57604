//! §4.8–§4.10 — the cell decoder, buffer decoder, and the top-level
//! `decode` pass [`crate::unserialize`] calls.

use bor1_core::ByteReader;

use crate::atom::parse_atom_table;
use crate::error::ScriptError;
use crate::host::{AtomId, BufferId, ContextAtom, HostEnv};
use crate::model::{
    Binding, BufferKind, Cell, CellValue, Coord, DataTypeValue, Kind, SeriesRange, SeriesSub, TimeCode, WordSub,
    BINDING_THREAD, BINDING_UNBOUND, RANGE_ALL, RANGE_ITER, RANGE_SLICE,
};

/// Length of the fixed header (§4.7): magic + atoms-offset + buffer-count.
/// Byte 12 — the start of the body — is the root buffer's own `BKIND` byte,
/// not a separate field; it is validated by peeking rather than consuming.
const HEADER_LEN: usize = 12;

/// Decodes a BOR1 byte stream into a `BLOCK` cell referencing the
/// rematerialized root buffer (§4.9, §6.2).
pub fn decode(host: &mut impl HostEnv, bytes: &[u8]) -> Result<Cell, ScriptError> {
    if bytes.len() < HEADER_LEN + 1 || &bytes[0..4] != b"BOR1" {
        return Err(ScriptError::BadHeader);
    }

    let mut header = ByteReader::new(&bytes[4..HEADER_LEN]);
    let atoms_offset = header.read_u32_be()?;
    let buffer_count = header.read_u32_be()?;

    let root_tag = bytes[HEADER_LEN];
    let root_kind = BufferKind::from_tag(root_tag).ok_or(ScriptError::BadHeader)?;
    if root_kind != BufferKind::Block {
        return Err(ScriptError::BadHeader);
    }

    let atoms = if atoms_offset == 0 {
        Vec::new()
    } else {
        let table = bytes.get(atoms_offset as usize..).ok_or(ScriptError::UnexpectedEof)?;
        parse_atom_table(host, table)
    };

    let buf_ids = host.alloc_buffers(buffer_count);

    let mut body = ByteReader::new(&bytes[HEADER_LEN..]);
    let result = decode_all_buffers(host, &buf_ids, &atoms, &mut body);

    if let Err(err) = result {
        for id in &buf_ids {
            host.init_empty(*id);
        }
        return Err(err);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(buffer_count, atom_count = atoms.len(), "bor1: decode complete");

    Ok(Cell::new(CellValue::Series {
        sub: SeriesSub::Block,
        buf: buf_ids[0],
        range: SeriesRange::All,
    }))
}

fn decode_all_buffers(
    host: &mut impl HostEnv,
    buf_ids: &[BufferId],
    atoms: &[AtomId],
    r: &mut ByteReader<'_>,
) -> Result<(), ScriptError> {
    for &id in buf_ids {
        decode_buffer(host, buf_ids, atoms, r, id)?;
    }
    Ok(())
}

fn decode_buffer(
    host: &mut impl HostEnv,
    buf_ids: &[BufferId],
    atoms: &[AtomId],
    r: &mut ByteReader<'_>,
    id: BufferId,
) -> Result<(), ScriptError> {
    let tag = r.read_u8()?;
    let kind = BufferKind::from_tag(tag).ok_or(ScriptError::InvalidBufferKind(tag))?;

    match kind {
        BufferKind::Bin | BufferKind::Bitset => {
            let used = r.read_varint_u32()?;
            let bytes = r.read_bytes(used as usize)?;
            host.init_bin(id, kind, bytes);
        }
        BufferKind::Str | BufferKind::File | BufferKind::Vector => {
            let form = r.read_u8()?;
            let used = r.read_varint_u32()?;
            let elem_size = host.elem_size_for_form(kind, form);
            let byte_len = used as usize * elem_size as usize;
            let bytes = r.read_bytes(byte_len)?;
            host.init_series_elems(id, kind, form, elem_size, bytes);
        }
        BufferKind::Context => {
            let used = r.read_varint_u32()?;
            // `(atom, original slot index)` pairs: the slot order must stay
            // aligned with `cells` below, so the atom is sorted afterwards
            // without disturbing which index it names (§3: cells stay in
            // slot order, the atom table is sorted by atom for lookup).
            let mut pairs = Vec::with_capacity(used as usize);
            for i in 0..used {
                let wire_atom = r.read_varint_u32()?;
                let atom = *atoms.get(wire_atom as usize).ok_or(ScriptError::InvalidBlock)?;
                pairs.push((atom, i));
            }
            let mut cells = Vec::with_capacity(used as usize);
            for _ in 0..used {
                cells.push(decode_cell(buf_ids, atoms, r)?);
            }
            pairs.sort_by_key(|(atom, _)| atom.0);
            let atom_table: Vec<ContextAtom> =
                pairs.into_iter().map(|(atom, index)| ContextAtom { atom, index }).collect();
            host.init_context(id, atom_table, cells);
        }
        // BLOCK / PAREN / PATH / LITPATH / SETPATH
        _ => {
            let used = r.read_varint_u32()?;
            let mut cells = Vec::with_capacity(used as usize);
            for _ in 0..used {
                cells.push(decode_cell(buf_ids, atoms, r)?);
            }
            host.init_block(id, kind, cells);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(buffer = id.0, kind = ?kind, "bor1: buffer decoded");

    Ok(())
}

fn decode_cell(buf_ids: &[BufferId], atoms: &[AtomId], r: &mut ByteReader<'_>) -> Result<Cell, ScriptError> {
    let tag = r.read_u8()?;
    let sol = tag & 0x80 != 0;
    let kind = Kind::from_u8(tag & 0x7F).ok_or(ScriptError::InvalidBlock)?;

    let value = match kind {
        Kind::Unset => CellValue::Unset,
        Kind::None => CellValue::None,
        Kind::Error => CellValue::Error,
        Kind::Logic => CellValue::Logic(r.read_varint_u32()? != 0),
        Kind::Char => CellValue::Char(r.read_varint_u32()?),
        Kind::Int => CellValue::Int(r.read_zigzag_i32()?),
        Kind::Decimal => CellValue::Decimal(r.read_f64_le()?),
        Kind::Bignum => CellValue::Bignum(r.read_u64_le()? as i64),
        Kind::Time => CellValue::Time(r.read_f64_le()?),
        Kind::Date => CellValue::Date(r.read_f64_le()?),
        Kind::Coord => {
            let len = r.read_u8()?;
            if !(1..=6).contains(&len) {
                return Err(ScriptError::InvalidBlock);
            }
            let mut n = [0i16; 6];
            for slot in n.iter_mut().take(len as usize) {
                *slot = r.read_zigzag_i32()? as i16;
            }
            CellValue::Coord(Coord { len, n })
        }
        Kind::Vec3 => {
            let mut v = [0f32; 3];
            for slot in &mut v {
                *slot = f32::from_bits(r.read_varint_u32()?);
            }
            CellValue::Vec3(v)
        }
        Kind::TimeCode => {
            let drop_frame = r.read_u8()? != 0;
            let mut n = [0i16; 4];
            for slot in &mut n {
                *slot = r.read_zigzag_i32()? as i16;
            }
            CellValue::TimeCode(TimeCode { drop_frame, n })
        }
        Kind::Datatype => {
            let byte = r.read_u8()?;
            if byte == Kind::MAX + 1 {
                let mask0 = r.read_u32_be()?;
                let mask1 = r.read_varint_u32()?;
                CellValue::Datatype(DataTypeValue::TypeMask { mask0, mask1 })
            } else {
                let single = Kind::from_u8(byte).ok_or(ScriptError::InvalidBlock)?;
                CellValue::Datatype(DataTypeValue::Single(single))
            }
        }
        Kind::Word | Kind::LitWord | Kind::SetWord | Kind::GetWord | Kind::Option => {
            let sub = WordSub::from_kind(kind).expect("kind is one of the five word kinds");
            let binding_tag = r.read_u8()?;
            let binding = match binding_tag {
                BINDING_UNBOUND => Binding::Unbound,
                BINDING_THREAD => {
                    let wire_ctx = r.read_varint_u32()?;
                    let index = r.read_varint_u32()?;
                    let ctx = *buf_ids.get(wire_ctx as usize).ok_or(ScriptError::InvalidBlock)?;
                    Binding::Thread { ctx, index }
                }
                _ => return Err(ScriptError::InvalidBlock),
            };
            let wire_atom = r.read_varint_u32()?;
            let atom = *atoms.get(wire_atom as usize).ok_or(ScriptError::InvalidBlock)?;
            CellValue::Word { sub, atom, binding }
        }
        Kind::Binary
        | Kind::Bitset
        | Kind::String
        | Kind::File
        | Kind::Vector
        | Kind::Block
        | Kind::Paren
        | Kind::Path
        | Kind::LitPath
        | Kind::SetPath => {
            let sub = SeriesSub::from_kind(kind).expect("kind is one of the ten series kinds");
            let wire_buf = r.read_varint_u32()?;
            let buf = *buf_ids.get(wire_buf as usize).ok_or(ScriptError::InvalidBlock)?;
            let range_mode = r.read_u8()?;
            let range = match range_mode {
                RANGE_ALL => SeriesRange::All,
                RANGE_ITER => SeriesRange::Iter { it: r.read_varint_u32()? },
                RANGE_SLICE => {
                    let it = r.read_varint_u32()?;
                    let end = r.read_varint_u32()?;
                    SeriesRange::Slice { it, end }
                }
                _ => return Err(ScriptError::InvalidBlock),
            };
            CellValue::Series { sub, buf, range }
        }
        Kind::Context => {
            let wire_buf = r.read_varint_u32()?;
            let buf = *buf_ids.get(wire_buf as usize).ok_or(ScriptError::InvalidBlock)?;
            CellValue::Context { buf }
        }
    };

    Ok(Cell { sol, value })
}
