//! bor1 — a self-contained binary codec for a dynamically-typed value
//! graph: shared buffers, positional cursors, interned symbols, and
//! context-bound words.
//!
//! The codec never touches a concrete value representation directly; it
//! only calls through the [`HostEnv`] trait (§6.1 of this crate's design
//! notes). [`MemoryHost`] is a reference, in-process implementation of that
//! trait good enough to round-trip real graphs in tests and small tools; an
//! embedder with its own arena implements `HostEnv` against its own types
//! instead.
//!
//! ```
//! use bor1::{BufferKind, Cell, CellValue, HostEnv, MemoryHost, SeriesRange, SeriesSub};
//!
//! let mut host = MemoryHost::new();
//! let root = host.make_block(BufferKind::Block, vec![Cell::new(CellValue::Int(1))]);
//!
//! let bytes = bor1::serialize(&host, root).unwrap();
//!
//! let mut out_host = MemoryHost::new();
//! let decoded = bor1::unserialize(&mut out_host, &bytes).unwrap();
//! assert!(matches!(
//!     decoded.value,
//!     CellValue::Series { sub: SeriesSub::Block, range: SeriesRange::All, .. }
//! ));
//! ```

#![deny(missing_docs)]

mod atom;
mod bufmap;
mod decode;
mod encode;
mod error;
mod host;
mod model;

pub use error::{Bor1Error, ScriptError};
pub use host::{AtomId, BufferId, ContextAtom, HostEnv, MemoryHost};
pub use model::{
    Binding, BufferKind, Cell, CellValue, Coord, DataTypeValue, Kind, SeriesRange, SeriesSub, TimeCode, WordSub,
};

/// Serializes the block at `root` and everything reachable from it into a
/// BOR1 byte stream (§6.2, §6.3).
///
/// # Errors
/// Returns [`Bor1Error::Type`] if `root` does not name a `BLOCK` buffer, or
/// [`Bor1Error::Script`] if a reachable buffer has an unsupported kind
/// (unreachable in practice, since [`BufferKind`] is a closed enum — kept
/// for parity with the error surface this was distilled from).
pub fn serialize(host: &impl HostEnv, root: BufferId) -> Result<Vec<u8>, Bor1Error> {
    if host.buffer_kind(root) != BufferKind::Block {
        return Err(Bor1Error::Type("serialize: argument is not a block".into()));
    }

    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!("bor1_serialize", root = root.0).entered();

    Ok(encode::encode(host, root)?)
}

/// Deserializes a BOR1 byte stream produced by [`serialize`] into a `BLOCK`
/// cell referencing the rematerialized root buffer (§6.2, §4.9).
///
/// # Errors
/// Returns [`Bor1Error::Script`] on any format violation: bad magic,
/// truncated input, an out-of-range kind or range-mode byte, or a buffer
/// whose `BKIND` byte names none of the eleven valid buffer kinds.
pub fn unserialize(host: &mut impl HostEnv, bytes: &[u8]) -> Result<Cell, Bor1Error> {
    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!("bor1_unserialize", len = bytes.len()).entered();

    Ok(decode::decode(host, bytes)?)
}
