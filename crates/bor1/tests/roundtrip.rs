//! Full-graph round-trip scenarios (testable properties and seed tests).

use bor1::{
    BufferKind, Cell, CellValue, ContextAtom, DataTypeValue, HostEnv, MemoryHost, ScriptError, SeriesRange,
    SeriesSub, TimeCode,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn empty_block_header_and_roundtrip() {
    let mut host = MemoryHost::new();
    let root = host.make_block(BufferKind::Block, Vec::new());
    let bytes = bor1::serialize(&host, root).unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(b"BOR1");
    expected.extend_from_slice(&0u32.to_be_bytes());
    expected.extend_from_slice(&1u32.to_be_bytes());
    expected.push(BufferKind::Block.tag());
    expected.push(0); // used = 0, one-byte varint
    assert_eq!(bytes, expected);

    let mut out = MemoryHost::new();
    let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
    match decoded.value {
        CellValue::Series { sub: SeriesSub::Block, buf, range: SeriesRange::All } => {
            assert!(out.cells(buf).is_empty());
        }
        other => panic!("expected an unsliced BLOCK reference, got {other:?}"),
    }
}

#[test]
fn three_ints_roundtrip() {
    let mut host = MemoryHost::new();
    let root = host.make_block(
        BufferKind::Block,
        vec![
            Cell::new(CellValue::Int(1)),
            Cell::new(CellValue::Int(-1)),
            Cell::new(CellValue::Int(0x7F)),
        ],
    );
    let bytes = bor1::serialize(&host, root).unwrap();

    let mut out = MemoryHost::new();
    let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
    let CellValue::Series { buf, .. } = decoded.value else { panic!("expected block") };
    let cells = out.cells(buf);
    assert_eq!(cells.len(), 3);
    assert_eq!(cells[0].value, CellValue::Int(1));
    assert_eq!(cells[1].value, CellValue::Int(-1));
    assert_eq!(cells[2].value, CellValue::Int(0x7F));
}

#[test]
fn word_bound_to_local_context_keeps_slot_index() {
    let mut host = MemoryHost::new();
    let a = host.intern(b"a");
    let b = host.intern(b"b");

    // The first two buffer ids are reserved "global" contexts under the
    // §4.5 binding policy (magnitude <= 1); allocate padding so this test's
    // context gets a non-global id and its binding survives encoding.
    let _pad0 = host.make_bin(BufferKind::Bin, Vec::new());
    let _pad1 = host.make_bin(BufferKind::Bin, Vec::new());

    // `context [a: 1 b: a]` — `b`'s value is a word bound to slot 0 of the
    // same context.
    let ctx = host.make_context(Vec::new(), Vec::new());
    assert!(ctx.0 > 1, "test requires a non-global context id");
    host.set_context(
        ctx,
        vec![ContextAtom { atom: a, index: 0 }, ContextAtom { atom: b, index: 1 }],
        vec![
            Cell::new(CellValue::Int(1)),
            Cell::new(CellValue::Word {
                sub: bor1::WordSub::Word,
                atom: a,
                binding: bor1::Binding::Thread { ctx, index: 0 },
            }),
        ],
    );
    let root = host.make_block(BufferKind::Block, vec![Cell::new(CellValue::Context { buf: ctx })]);

    let bytes = bor1::serialize(&host, root).unwrap();

    let mut out = MemoryHost::new();
    let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
    let CellValue::Series { buf: root_buf, .. } = decoded.value else { panic!("expected block") };
    let CellValue::Context { buf: decoded_ctx } = out.cells(root_buf)[0].value else { panic!("expected context") };

    let cells = out.cells(decoded_ctx);
    match &cells[1].value {
        CellValue::Word { binding: bor1::Binding::Thread { ctx: bound_ctx, index }, atom, .. } => {
            assert_eq!(*bound_ctx, decoded_ctx);
            assert_eq!(*index, 0);
            assert_eq!(out.atom_name(*atom), b"a");
        }
        other => panic!("expected a bound word, got {other:?}"),
    }
}

#[test]
fn global_context_binding_decodes_as_unbound() {
    let mut host = MemoryHost::new();
    let atom = host.intern(b"self");
    // Context buffer id 1 stands in for one of the host's "global" contexts
    // (§4.5 binding policy: magnitude <= 1).
    let global_ctx = host.make_context(Vec::new(), Vec::new());
    assert!(global_ctx.0 <= 1, "test assumes the first allocated buffer gets a global-magnitude id");

    let root = host.make_block(
        BufferKind::Block,
        vec![Cell::new(CellValue::Word {
            sub: bor1::WordSub::Word,
            atom,
            binding: bor1::Binding::Thread { ctx: global_ctx, index: 3 },
        })],
    );

    let bytes = bor1::serialize(&host, root).unwrap();

    let mut out = MemoryHost::new();
    let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
    let CellValue::Series { buf, .. } = decoded.value else { panic!("expected block") };
    match &out.cells(buf)[0].value {
        CellValue::Word { binding, .. } => assert_eq!(*binding, bor1::Binding::Unbound),
        other => panic!("expected a word, got {other:?}"),
    }
}

#[test]
fn shared_sliced_string_keeps_identity_and_cursor() {
    let mut host = MemoryHost::new();
    let s = host.make_series(BufferKind::Str, 0, 1, b"hello".to_vec());
    let root = host.make_block(
        BufferKind::Block,
        vec![
            Cell::new(CellValue::Series { sub: SeriesSub::String, buf: s, range: SeriesRange::Slice { it: 1, end: 4 } }),
            Cell::new(CellValue::Series { sub: SeriesSub::String, buf: s, range: SeriesRange::Slice { it: 1, end: 4 } }),
        ],
    );

    let bytes = bor1::serialize(&host, root).unwrap();

    let mut out = MemoryHost::new();
    let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
    let CellValue::Series { buf: root_buf, .. } = decoded.value else { panic!("expected block") };
    let cells = out.cells(root_buf);

    let (buf0, range0) = match &cells[0].value {
        CellValue::Series { buf, range, .. } => (*buf, *range),
        _ => panic!("expected series"),
    };
    let (buf1, range1) = match &cells[1].value {
        CellValue::Series { buf, range, .. } => (*buf, *range),
        _ => panic!("expected series"),
    };

    assert_eq!(buf0, buf1, "both cells must share one rematerialized buffer");
    assert_eq!(range0, SeriesRange::Slice { it: 1, end: 4 });
    assert_eq!(range1, SeriesRange::Slice { it: 1, end: 4 });
    assert_eq!(out.raw_bytes(buf0), b"hello");
}

#[test]
fn self_referential_block_cycle_survives_roundtrip() {
    let mut host = MemoryHost::new();
    let inner = host.make_block(BufferKind::Block, Vec::new());
    host.set_block_cells(
        inner,
        vec![Cell::new(CellValue::Series { sub: SeriesSub::Block, buf: inner, range: SeriesRange::All })],
    );
    let root = host.make_block(
        BufferKind::Block,
        vec![
            Cell::new(CellValue::Series { sub: SeriesSub::Block, buf: inner, range: SeriesRange::All }),
            Cell::new(CellValue::Series { sub: SeriesSub::Block, buf: inner, range: SeriesRange::All }),
        ],
    );

    let bytes = bor1::serialize(&host, root).unwrap();

    let mut out = MemoryHost::new();
    let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
    let CellValue::Series { buf: root_buf, .. } = decoded.value else { panic!("expected block") };
    let outer_cells = out.cells(root_buf);

    let (a, b) = match (&outer_cells[0].value, &outer_cells[1].value) {
        (CellValue::Series { buf: a, .. }, CellValue::Series { buf: b, .. }) => (*a, *b),
        _ => panic!("expected two series cells"),
    };
    assert_eq!(a, b, "both outer references must point at one buffer");

    let inner_cells = out.cells(a);
    assert_eq!(inner_cells.len(), 1);
    match &inner_cells[0].value {
        CellValue::Series { buf, .. } => assert_eq!(*buf, a, "the buffer must contain a reference to itself"),
        other => panic!("expected a self-reference, got {other:?}"),
    }
}

#[test]
fn rejects_bytes_without_bor1_magic() {
    let mut out = MemoryHost::new();
    let err = bor1::unserialize(&mut out, b"not a bor1 stream at all").unwrap_err();
    assert!(matches!(err, bor1::Bor1Error::Script(ScriptError::BadHeader)));
}

#[test]
fn rejects_truncated_stream() {
    let mut host = MemoryHost::new();
    let root = host.make_block(BufferKind::Block, vec![Cell::new(CellValue::Int(1))]);
    let bytes = bor1::serialize(&host, root).unwrap();

    let mut out = MemoryHost::new();
    let err = bor1::unserialize(&mut out, &bytes[..bytes.len() - 1]).unwrap_err();
    assert!(matches!(err, bor1::Bor1Error::Script(ScriptError::UnexpectedEof)));
}

#[test]
fn rejects_invalid_range_mode() {
    // Hand-built stream: one buffer (the root block) holding a single
    // BINARY-reference cell whose range-mode byte is the invalid value 3.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"BOR1");
    bytes.extend_from_slice(&0u32.to_be_bytes()); // atoms-offset
    bytes.extend_from_slice(&1u32.to_be_bytes()); // buffer-count
    bytes.push(BufferKind::Block.tag()); // buffer 0's own BKIND byte, also the header's validation byte
    bytes.push(1); // used = 1 cell
    bytes.push(18); // BINARY tag, sol = 0
    bytes.push(0); // buf-index varint = 0
    bytes.push(3); // invalid range-mode

    let mut out = MemoryHost::new();
    let err = bor1::unserialize(&mut out, &bytes).unwrap_err();
    assert!(matches!(err, bor1::Bor1Error::Script(ScriptError::InvalidBlock)));
}

#[test]
fn vector_buffer_roundtrip() {
    let mut host = MemoryHost::new();
    // form's low two bits select a 4-byte element width (§6.4 convention).
    let form = 0b10;
    let elem_size = 4u8;
    let raw: Vec<u8> = [1.5f32, -2.25, 0.0, 1000.0].iter().flat_map(|f| f.to_le_bytes()).collect();
    let vec_buf = host.make_series(BufferKind::Vector, form, elem_size, raw.clone());
    let root = host.make_block(
        BufferKind::Block,
        vec![Cell::new(CellValue::Series { sub: SeriesSub::Vector, buf: vec_buf, range: SeriesRange::All })],
    );

    let bytes = bor1::serialize(&host, root).unwrap();

    let mut out = MemoryHost::new();
    let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
    let CellValue::Series { buf: root_buf, .. } = decoded.value else { panic!("expected block") };
    match &out.cells(root_buf)[0].value {
        CellValue::Series { sub: SeriesSub::Vector, buf, range: SeriesRange::All } => {
            assert_eq!(out.form(*buf), form);
            assert_eq!(out.raw_bytes(*buf), raw.as_slice());
        }
        other => panic!("expected a VECTOR reference, got {other:?}"),
    }
}

#[test]
fn timecode_cell_roundtrip() {
    let mut host = MemoryHost::new();
    let tc = TimeCode { drop_frame: true, n: [1, 2, 59, 24] };
    let root = host.make_block(BufferKind::Block, vec![Cell::new(CellValue::TimeCode(tc))]);

    let bytes = bor1::serialize(&host, root).unwrap();

    let mut out = MemoryHost::new();
    let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
    let CellValue::Series { buf, .. } = decoded.value else { panic!("expected block") };
    match &out.cells(buf)[0].value {
        CellValue::TimeCode(got) => {
            assert_eq!(got.drop_frame, tc.drop_frame);
            assert_eq!(got.n, tc.n);
        }
        other => panic!("expected a TIMECODE cell, got {other:?}"),
    }
}

#[test]
fn datatype_typemask_roundtrip() {
    let mut host = MemoryHost::new();
    let dt = DataTypeValue::TypeMask { mask0: 0xFFFF_0001, mask1: 0x0000_0100 };
    let root = host.make_block(BufferKind::Block, vec![Cell::new(CellValue::Datatype(dt))]);

    let bytes = bor1::serialize(&host, root).unwrap();

    let mut out = MemoryHost::new();
    let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
    let CellValue::Series { buf, .. } = decoded.value else { panic!("expected block") };
    match &out.cells(buf)[0].value {
        CellValue::Datatype(DataTypeValue::TypeMask { mask0, mask1 }) => {
            assert_eq!(*mask0, 0xFFFF_0001);
            assert_eq!(*mask1, 0x0000_0100);
        }
        other => panic!("expected a DATATYPE typemask, got {other:?}"),
    }
}

/// A small closed subset of [`CellValue`] cheap enough for proptest to shrink,
/// used to build random root blocks for [`small_random_block_roundtrips`].
#[derive(Debug, Clone)]
enum SimpleVal {
    Unset,
    None,
    Logic(bool),
    Char(u32),
    Int(i32),
}

fn simple_val_strategy() -> impl Strategy<Value = SimpleVal> {
    prop_oneof![
        Just(SimpleVal::Unset),
        Just(SimpleVal::None),
        any::<bool>().prop_map(SimpleVal::Logic),
        (0u32..0x0011_0000).prop_map(SimpleVal::Char),
        any::<i32>().prop_map(SimpleVal::Int),
    ]
}

fn into_cell(v: &SimpleVal) -> Cell {
    Cell::new(match *v {
        SimpleVal::Unset => CellValue::Unset,
        SimpleVal::None => CellValue::None,
        SimpleVal::Logic(b) => CellValue::Logic(b),
        SimpleVal::Char(c) => CellValue::Char(c),
        SimpleVal::Int(n) => CellValue::Int(n),
    })
}

proptest! {
    #[test]
    fn small_random_block_roundtrips(values in prop::collection::vec(simple_val_strategy(), 0..8)) {
        let mut host = MemoryHost::new();
        let cells: Vec<Cell> = values.iter().map(into_cell).collect();
        let root = host.make_block(BufferKind::Block, cells.clone());

        let bytes = bor1::serialize(&host, root).unwrap();

        let mut out = MemoryHost::new();
        let decoded = bor1::unserialize(&mut out, &bytes).unwrap();
        let CellValue::Series { buf, .. } = decoded.value else { panic!("expected block") };
        prop_assert_eq!(out.cells(buf), cells.as_slice());
    }
}
