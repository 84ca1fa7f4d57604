//! §6.1 — the Host Value Environment contract, plus a reference in-memory
//! implementation (§6.4) used by this crate's own tests and available to
//! downstream embedders that have no arena of their own yet.
//!
//! The codec (`encode`/`decode`) never touches a concrete value
//! representation: it only calls through [`HostEnv`]. A real interpreter
//! plugs its own arena in by implementing the trait; nothing in `encode` or
//! `decode` changes.

use indexmap::IndexMap;

use crate::model::{BufferKind, Cell};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque id of an interned symbol, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AtomId(pub u32);

/// Opaque id of a heap buffer, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferId(pub u32);

/// One element of a `CONTEXT` buffer's atom→slot table (§3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContextAtom {
    /// The bound word's interned name.
    pub atom: AtomId,
    /// Its slot index within the context.
    pub index: u32,
}

/// The capabilities the BOR1 codec needs from a host value environment
/// (§6.1). Encoding only ever calls the read-only half of this trait;
/// decoding only ever calls the allocating half.
pub trait HostEnv {
    /// Looks up the buffer kind of an already-allocated buffer.
    fn buffer_kind(&self, id: BufferId) -> BufferKind;

    /// Derives the element width in bytes of a `STR`/`FILE`/`VECTOR` buffer
    /// from its `form` byte (§4.6: `elemSize` is never itself transmitted,
    /// only `form` is, since the host's value representation determines the
    /// width a given form implies). Called by the decoder before it knows
    /// how many raw bytes to read for a buffer's payload.
    fn elem_size_for_form(&self, kind: BufferKind, form: u8) -> u8;

    /// Number of live elements in the buffer (bytes, chars, cells, or
    /// context slots depending on kind).
    fn buffer_len(&self, id: BufferId) -> u32;

    /// Element width in bytes for `STR`/`FILE`/`VECTOR` buffers (1, 2, 4, or
    /// 8); meaningless for other kinds.
    fn elem_size(&self, id: BufferId) -> u8;

    /// Encoding/subtype byte for `STR`/`FILE`/`VECTOR` buffers.
    fn form(&self, id: BufferId) -> u8;

    /// Raw element bytes of a `BIN`/`BITSET`/`STR`/`FILE`/`VECTOR` buffer,
    /// `buffer_len(id) * elem_size(id)` bytes long (1 for `BIN`/`BITSET`).
    fn raw_bytes(&self, id: BufferId) -> &[u8];

    /// The `used` cells of a `BLOCK`/`PAREN`/`PATH`/`LITPATH`/`SETPATH` or
    /// `CONTEXT` buffer, in slot order.
    fn cells(&self, id: BufferId) -> &[Cell];

    /// The word-atom table of a `CONTEXT` buffer, in slot order (parallel to
    /// [`HostEnv::cells`]).
    fn context_atoms(&self, id: BufferId) -> &[ContextAtom];

    /// Interns a name, returning a stable atom id.
    fn intern(&mut self, name: &[u8]) -> AtomId;

    /// Looks up the textual name behind an atom id.
    fn atom_name(&self, id: AtomId) -> &[u8];

    /// Allocates `count` fresh, empty buffers and returns their ids in
    /// order. Used by the decoder before any payload is read (§4.9 step 3)
    /// so that forward/self references resolve immediately.
    fn alloc_buffers(&mut self, count: u32) -> Vec<BufferId>;

    /// Fills a `BIN`/`BITSET` buffer with `bytes`.
    fn init_bin(&mut self, id: BufferId, kind: BufferKind, bytes: &[u8]);

    /// Fills a `STR`/`FILE`/`VECTOR` buffer.
    fn init_series_elems(&mut self, id: BufferId, kind: BufferKind, form: u8, elem_size: u8, bytes: &[u8]);

    /// Fills a `BLOCK`/`PAREN`/`PATH`/`LITPATH`/`SETPATH` buffer with decoded
    /// cells.
    fn init_block(&mut self, id: BufferId, kind: BufferKind, cells: Vec<Cell>);

    /// Fills a `CONTEXT` buffer with its atom table and value slots, already
    /// sorted by atom as §4.9 requires.
    fn init_context(&mut self, id: BufferId, atoms: Vec<ContextAtom>, cells: Vec<Cell>);

    /// Resets an allocated-but-never-filled buffer to an empty, valid `BIN`
    /// so decoder failure (§4.10) never leaves a half-initialized buffer
    /// behind.
    fn init_empty(&mut self, id: BufferId);
}

/// Buffer storage backing [`MemoryHost`]. One variant per `BufferKind`.
#[derive(Debug, Clone)]
enum Storage {
    Bytes { kind: BufferKind, bytes: Vec<u8> },
    Elems { kind: BufferKind, form: u8, elem_size: u8, bytes: Vec<u8> },
    Cells { kind: BufferKind, cells: Vec<Cell> },
    Context { atoms: Vec<ContextAtom>, cells: Vec<Cell> },
}

impl Storage {
    fn kind(&self) -> BufferKind {
        match self {
            Storage::Bytes { kind, .. } | Storage::Elems { kind, .. } | Storage::Cells { kind, .. } => *kind,
            Storage::Context { .. } => BufferKind::Context,
        }
    }

    fn len(&self) -> u32 {
        match self {
            Storage::Bytes { bytes, .. } => bytes.len() as u32,
            Storage::Elems { bytes, elem_size, .. } => {
                let elem_size = (*elem_size).max(1) as u32;
                (bytes.len() as u32) / elem_size
            }
            Storage::Cells { cells, .. } => cells.len() as u32,
            Storage::Context { cells, .. } => cells.len() as u32,
        }
    }
}

/// Reference, arena-backed [`HostEnv`] implementation: every buffer lives in
/// a flat `Vec`, indexed by `BufferId`; atoms live in an
/// insertion-ordered map from name to id. Not a BOR1 format feature — just
/// the plumbing this crate's tests (and any embedder without an arena of its
/// own yet) need to exercise the codec end to end.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    buffers: Vec<Storage>,
    atom_names: Vec<Vec<u8>>,
    atom_lookup: IndexMap<Vec<u8>, AtomId>,
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn storage(&self, id: BufferId) -> &Storage {
        &self.buffers[id.0 as usize]
    }

    fn storage_mut(&mut self, id: BufferId) -> &mut Storage {
        &mut self.buffers[id.0 as usize]
    }

    /// Allocates a single `BIN`/`BITSET` buffer already filled with `bytes`,
    /// returning its id. Convenience for building test graphs.
    pub fn make_bin(&mut self, kind: BufferKind, bytes: Vec<u8>) -> BufferId {
        self.buffers.push(Storage::Bytes { kind, bytes });
        BufferId((self.buffers.len() - 1) as u32)
    }

    /// Allocates a `STR`/`FILE`/`VECTOR` buffer.
    pub fn make_series(&mut self, kind: BufferKind, form: u8, elem_size: u8, bytes: Vec<u8>) -> BufferId {
        self.buffers.push(Storage::Elems { kind, form, elem_size, bytes });
        BufferId((self.buffers.len() - 1) as u32)
    }

    /// Allocates a `BLOCK`/`PAREN`/`PATH`/`LITPATH`/`SETPATH` buffer.
    pub fn make_block(&mut self, kind: BufferKind, cells: Vec<Cell>) -> BufferId {
        self.buffers.push(Storage::Cells { kind, cells });
        BufferId((self.buffers.len() - 1) as u32)
    }

    /// Allocates a `CONTEXT` buffer. `atoms` and `cells` must be parallel and
    /// already sorted by atom, mirroring what a real context keeps.
    pub fn make_context(&mut self, atoms: Vec<ContextAtom>, cells: Vec<Cell>) -> BufferId {
        self.buffers.push(Storage::Context { atoms, cells });
        BufferId((self.buffers.len() - 1) as u32)
    }

    /// Replaces the cells of an already-allocated block-like buffer. Used to
    /// build cyclic graphs (a block that contains a cell referencing
    /// itself) without a chicken-and-egg allocation order.
    pub fn set_block_cells(&mut self, id: BufferId, cells: Vec<Cell>) {
        match self.storage_mut(id) {
            Storage::Cells { cells: slot, .. } => *slot = cells,
            _ => panic!("set_block_cells on a non-block buffer"),
        }
    }

    /// Mutable access to a context buffer's cells, for the same
    /// self-reference-building use case as [`MemoryHost::set_block_cells`].
    pub fn set_context(&mut self, id: BufferId, atoms: Vec<ContextAtom>, cells: Vec<Cell>) {
        match self.storage_mut(id) {
            Storage::Context { atoms: a, cells: c } => {
                *a = atoms;
                *c = cells;
            }
            _ => panic!("set_context on a non-context buffer"),
        }
    }
}

impl HostEnv for MemoryHost {
    fn buffer_kind(&self, id: BufferId) -> BufferKind {
        self.storage(id).kind()
    }

    fn buffer_len(&self, id: BufferId) -> u32 {
        self.storage(id).len()
    }

    fn elem_size(&self, id: BufferId) -> u8 {
        match self.storage(id) {
            Storage::Elems { elem_size, .. } => *elem_size,
            _ => 1,
        }
    }

    fn form(&self, id: BufferId) -> u8 {
        match self.storage(id) {
            Storage::Elems { form, .. } => *form,
            _ => 0,
        }
    }

    fn elem_size_for_form(&self, _kind: BufferKind, form: u8) -> u8 {
        // Reference convention: the low two bits of `form` select a width
        // of 1/2/4/8 bytes; the remaining bits are free for the host to use
        // as an encoding subtag (e.g. signed-vs-unsigned, float-vs-int).
        1u8 << (form & 0x03)
    }

    fn raw_bytes(&self, id: BufferId) -> &[u8] {
        match self.storage(id) {
            Storage::Bytes { bytes, .. } | Storage::Elems { bytes, .. } => bytes,
            _ => &[],
        }
    }

    fn cells(&self, id: BufferId) -> &[Cell] {
        match self.storage(id) {
            Storage::Cells { cells, .. } | Storage::Context { cells, .. } => cells,
            _ => &[],
        }
    }

    fn context_atoms(&self, id: BufferId) -> &[ContextAtom] {
        match self.storage(id) {
            Storage::Context { atoms, .. } => atoms,
            _ => &[],
        }
    }

    fn intern(&mut self, name: &[u8]) -> AtomId {
        if let Some(id) = self.atom_lookup.get(name) {
            return *id;
        }
        let id = AtomId(self.atom_names.len() as u32);
        self.atom_names.push(name.to_vec());
        self.atom_lookup.insert(name.to_vec(), id);
        id
    }

    fn atom_name(&self, id: AtomId) -> &[u8] {
        &self.atom_names[id.0 as usize]
    }

    fn alloc_buffers(&mut self, count: u32) -> Vec<BufferId> {
        let start = self.buffers.len() as u32;
        for _ in 0..count {
            self.buffers.push(Storage::Bytes { kind: BufferKind::Bin, bytes: Vec::new() });
        }
        (0..count).map(|i| BufferId(start + i)).collect()
    }

    fn init_bin(&mut self, id: BufferId, kind: BufferKind, bytes: &[u8]) {
        *self.storage_mut(id) = Storage::Bytes { kind, bytes: bytes.to_vec() };
    }

    fn init_series_elems(&mut self, id: BufferId, kind: BufferKind, form: u8, elem_size: u8, bytes: &[u8]) {
        *self.storage_mut(id) = Storage::Elems { kind, form, elem_size, bytes: bytes.to_vec() };
    }

    fn init_block(&mut self, id: BufferId, kind: BufferKind, cells: Vec<Cell>) {
        *self.storage_mut(id) = Storage::Cells { kind, cells };
    }

    fn init_context(&mut self, id: BufferId, atoms: Vec<ContextAtom>, cells: Vec<Cell>) {
        *self.storage_mut(id) = Storage::Context { atoms, cells };
    }

    fn init_empty(&mut self, id: BufferId) {
        *self.storage_mut(id) = Storage::Bytes { kind: BufferKind::Bin, bytes: Vec::new() };
    }
}
