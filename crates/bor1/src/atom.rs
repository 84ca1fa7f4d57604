//! §4.3 — the encoder's atom map: an insertion-ordered scratch table that
//! dedups the atoms referenced while walking a graph and, at the end,
//! serializes them as the trailing name table.

use indexmap::IndexSet;

use crate::host::{AtomId, HostEnv};
use bor1_core::ByteWriter;

/// Insertion-ordered `atom id → wire index` table, scoped to a single
/// [`crate::serialize`] call.
#[derive(Debug, Default)]
pub struct AtomMap {
    order: IndexSet<AtomId>,
}

impl AtomMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `atom`'s wire index, assigning the next one if this is its
    /// first appearance.
    pub fn intern(&mut self, atom: AtomId) -> u32 {
        let (idx, _inserted) = self.order.insert_full(atom);
        idx as u32
    }

    /// Whether no atom has been referenced yet (the header's atoms-offset
    /// stays zero in that case).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Writes the name table: each atom's name, space-separated, with the
    /// final name `NUL`-terminated (§4.3).
    pub fn write_names(&self, host: &impl HostEnv, out: &mut ByteWriter) {
        let last = self.order.len().saturating_sub(1);
        for (i, atom) in self.order.iter().enumerate() {
            out.write_bytes(host.atom_name(*atom));
            out.write_u8(if i == last { 0x00 } else { b' ' });
        }
    }
}

/// Splits a decoder's name-table bytes into atoms, interning each through
/// the host in order, inverting [`AtomMap::write_names`] (§4.9 step 2).
pub fn parse_atom_table(host: &mut impl HostEnv, table: &[u8]) -> Vec<AtomId> {
    let mut atoms = Vec::new();
    let mut start = 0usize;
    for (i, &b) in table.iter().enumerate() {
        if b == b' ' || b == 0x00 {
            atoms.push(host.intern(&table[start..i]));
            start = i + 1;
            if b == 0x00 {
                break;
            }
        }
    }
    atoms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use pretty_assertions::assert_eq;

    #[test]
    fn interns_in_first_reference_order_and_dedups() {
        let mut host = MemoryHost::new();
        let a = host.intern(b"alpha");
        let b = host.intern(b"beta");
        let mut map = AtomMap::new();
        assert_eq!(map.intern(b), 0);
        assert_eq!(map.intern(a), 1);
        assert_eq!(map.intern(b), 0);
        assert!(!map.is_empty());
    }

    #[test]
    fn name_table_roundtrips() {
        let mut host = MemoryHost::new();
        let a = host.intern(b"alpha");
        let b = host.intern(b"beta");
        let mut map = AtomMap::new();
        map.intern(a);
        map.intern(b);

        let mut out = ByteWriter::new();
        map.write_names(&host, &mut out);
        assert_eq!(out.as_slice(), b"alpha beta\0");

        let mut host2 = MemoryHost::new();
        let atoms = parse_atom_table(&mut host2, out.as_slice());
        assert_eq!(host2.atom_name(atoms[0]), b"alpha");
        assert_eq!(host2.atom_name(atoms[1]), b"beta");
    }
}
