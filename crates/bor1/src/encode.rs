//! §4.5–§4.7 — the cell encoder, buffer encoder, and header writer, wired
//! together into the single top-level `encode` pass that [`crate::serialize`]
//! calls.

use bor1_core::ByteWriter;

use crate::atom::AtomMap;
use crate::bufmap::BufferMap;
use crate::error::ScriptError;
use crate::host::{BufferId, HostEnv};
use crate::model::{
    Binding, BufferKind, Cell, CellValue, DataTypeValue, Kind, SeriesRange, BINDING_THREAD, BINDING_UNBOUND,
    RANGE_ALL, RANGE_ITER, RANGE_SLICE,
};

const MAGIC: &[u8; 4] = b"BOR1";

/// A context buffer id whose wire index has this magnitude or less is one
/// of the host's "global" contexts; words bound into it serialize as
/// `UNBOUND` (§4.5 binding policy).
const GLOBAL_CONTEXT_MAGNITUDE: u32 = 1;

/// Encodes `root` (which must be a `BLOCK` buffer) and everything reachable
/// from it into a BOR1 byte stream (§4.7, §6.2).
pub fn encode(host: &impl HostEnv, root: BufferId) -> Result<Vec<u8>, ScriptError> {
    let mut out = ByteWriter::new();
    out.write_bytes(MAGIC);
    let atoms_offset_at = out.len();
    out.write_u32_be(0);
    let buffer_count_at = out.len();
    out.write_u32_be(0);

    // No separate header byte for the root kind: buffer 0 is always the
    // root (BufferMap guarantees this), so its own BKIND byte — written by
    // the first iteration of the loop below — lands at offset 12 and
    // doubles as the header's validation byte (§4.7).
    let mut atoms = AtomMap::new();
    let mut buffers = BufferMap::new();
    buffers.intern(root);

    let mut i = 0usize;
    while i < buffers.len() {
        let id = buffers.get(i);
        encode_buffer(host, id, &mut atoms, &mut buffers, &mut out)?;
        i += 1;
    }

    let buffer_count = buffers.len() as u32;
    out.patch_u32_be(buffer_count_at, buffer_count);

    let atoms_offset = if atoms.is_empty() {
        0
    } else {
        let offset = out.len() as u32;
        atoms.write_names(host, &mut out);
        offset
    };
    out.patch_u32_be(atoms_offset_at, atoms_offset);

    #[cfg(feature = "tracing")]
    tracing::debug!(buffer_count, atoms_offset, "bor1: encode complete");

    Ok(out.into_vec())
}

fn encode_buffer(
    host: &impl HostEnv,
    id: BufferId,
    atoms: &mut AtomMap,
    buffers: &mut BufferMap,
    out: &mut ByteWriter,
) -> Result<(), ScriptError> {
    let kind = host.buffer_kind(id);
    out.write_u8(kind.tag());

    if kind.is_byte_like() {
        let bytes = host.raw_bytes(id);
        out.write_varint_u32(bytes.len() as u32);
        out.write_bytes(bytes);
    } else if kind.is_elem_series() {
        out.write_u8(host.form(id));
        out.write_varint_u32(host.buffer_len(id));
        out.write_bytes(host.raw_bytes(id));
    } else if kind == BufferKind::Context {
        let ctx_atoms = host.context_atoms(id);
        let cells = host.cells(id);
        out.write_varint_u32(ctx_atoms.len() as u32);
        for slot in ctx_atoms {
            let idx = atoms.intern(slot.atom);
            out.write_varint_u32(idx);
        }
        for cell in cells {
            encode_cell(host, cell, atoms, buffers, out)?;
        }
    } else {
        // BLOCK / PAREN / PATH / LITPATH / SETPATH — plain cell arrays.
        let cells = host.cells(id);
        out.write_varint_u32(cells.len() as u32);
        for cell in cells {
            encode_cell(host, cell, atoms, buffers, out)?;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(buffer = id.0, kind = ?kind, "bor1: buffer emitted");

    Ok(())
}

fn encode_cell(
    host: &impl HostEnv,
    cell: &Cell,
    atoms: &mut AtomMap,
    buffers: &mut BufferMap,
    out: &mut ByteWriter,
) -> Result<(), ScriptError> {
    let sol_bit = if cell.sol { 0x80 } else { 0x00 };
    let tag = cell.value.kind() as u8 | sol_bit;

    match &cell.value {
        CellValue::Unset | CellValue::None | CellValue::Error => {
            out.write_u8(tag);
        }
        CellValue::Logic(b) => {
            out.write_u8(tag);
            out.write_varint_u32(u32::from(*b));
        }
        CellValue::Char(c) => {
            out.write_u8(tag);
            out.write_varint_u32(*c);
        }
        CellValue::Int(n) => {
            out.write_u8(tag);
            out.write_zigzag_i32(*n);
        }
        CellValue::Decimal(v) => {
            out.write_u8(tag);
            out.write_f64_le(*v);
        }
        CellValue::Bignum(v) => {
            out.write_u8(tag);
            out.write_u64_le(*v as u64);
        }
        CellValue::Time(v) | CellValue::Date(v) => {
            out.write_u8(tag);
            out.write_f64_le(*v);
        }
        CellValue::Coord(c) => {
            out.write_u8(tag);
            out.write_u8(c.len);
            for &n in c.components() {
                out.write_zigzag_i32(i32::from(n));
            }
        }
        CellValue::Vec3(v) => {
            out.write_u8(tag);
            for component in v {
                out.write_varint_u32(component.to_bits());
            }
        }
        CellValue::TimeCode(tc) => {
            out.write_u8(tag);
            out.write_u8(u8::from(tc.drop_frame));
            for n in tc.n {
                out.write_zigzag_i32(i32::from(n));
            }
        }
        CellValue::Datatype(dt) => {
            out.write_u8(tag);
            match dt {
                DataTypeValue::Single(kind) => out.write_u8(*kind as u8),
                DataTypeValue::TypeMask { mask0, mask1 } => {
                    out.write_u8(Kind::MAX + 1);
                    out.write_u32_be(*mask0);
                    out.write_varint_u32(*mask1);
                }
            }
        }
        CellValue::Word { atom, binding, .. } => {
            out.write_u8(tag);
            let effective = normalize_binding(*binding);
            match effective {
                Binding::Unbound => out.write_u8(BINDING_UNBOUND),
                Binding::Thread { ctx, index } => {
                    out.write_u8(BINDING_THREAD);
                    out.write_varint_u32(buffers.intern(ctx));
                    out.write_varint_u32(index);
                }
            }
            out.write_varint_u32(atoms.intern(*atom));
        }
        CellValue::Series { buf, range, .. } => {
            out.write_u8(tag);
            out.write_varint_u32(buffers.intern(*buf));
            match range {
                SeriesRange::All => out.write_u8(RANGE_ALL),
                SeriesRange::Iter { it } => {
                    out.write_u8(RANGE_ITER);
                    out.write_varint_u32(*it);
                }
                SeriesRange::Slice { it, end } => {
                    out.write_u8(RANGE_SLICE);
                    out.write_varint_u32(*it);
                    out.write_varint_u32(*end);
                }
            }
        }
        CellValue::Context { buf } => {
            out.write_u8(tag);
            out.write_varint_u32(buffers.intern(*buf));
        }
    }

    Ok(())
}

/// Applies the §4.5 binding policy: a `THREAD` binding into a context of
/// magnitude ≤1 (a "global" context) is rewritten to `UNBOUND` on the wire.
fn normalize_binding(binding: Binding) -> Binding {
    match binding {
        Binding::Thread { ctx, .. } if ctx.0 <= GLOBAL_CONTEXT_MAGNITUDE => Binding::Unbound,
        other => other,
    }
}
