//! §4.4 — the encoder's buffer map: dedups original buffer ids and assigns
//! each a dense wire index. Appending a new id also schedules it for
//! serialization; [`crate::encode::encode`] drains the map by index rather
//! than an explicit queue, so buffers discovered mid-traversal are visited
//! in the same pass (§5: "ordering... depends only on the traversal").

use indexmap::IndexSet;

use crate::host::BufferId;

/// Insertion-ordered `buffer id → wire index` table, scoped to a single
/// [`crate::serialize`] call. The root buffer is always interned first, so
/// it always receives wire index 0 (§4.4, §8 property 5).
#[derive(Debug, Default)]
pub struct BufferMap {
    order: IndexSet<BufferId>,
}

impl BufferMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `id`'s wire index, assigning the next one — and scheduling
    /// it for serialization — if this is its first appearance.
    pub fn intern(&mut self, id: BufferId) -> u32 {
        let (idx, _inserted) = self.order.insert_full(id);
        idx as u32
    }

    /// Number of distinct buffers scheduled so far. Grows while the
    /// encoder's main loop is still draining it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// The original buffer id at a given wire index.
    #[must_use]
    pub fn get(&self, wire_index: usize) -> BufferId {
        *self
            .order
            .get_index(wire_index)
            .expect("wire_index out of range for BufferMap")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn root_gets_wire_index_zero_and_dedups() {
        let root = BufferId(7);
        let other = BufferId(3);
        let mut map = BufferMap::new();
        assert_eq!(map.intern(root), 0);
        assert_eq!(map.intern(other), 1);
        assert_eq!(map.intern(root), 0);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(0), root);
        assert_eq!(map.get(1), other);
    }
}
