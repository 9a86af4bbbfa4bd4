use slotmap::SlotMap;

use crate::error::SkeletonError;

slotmap::new_key_type! {
    /// Unique identifier for a vertex in a [`RingStore`].
    pub struct RingVertexId;
}

#[derive(Debug, Clone)]
struct RingNode<T> {
    data: T,
    prev: RingVertexId,
    next: RingVertexId,
}

/// Arena of closed, doubly linked vertex rings.
///
/// Any number of rings share one arena. Vertices are addressed by
/// generational ids, so inserting or removing a vertex never invalidates an
/// id held elsewhere.
#[derive(Debug, Clone)]
pub struct RingStore<T> {
    nodes: SlotMap<RingVertexId, RingNode<T>>,
}

impl<T> Default for RingStore<T> {
    fn default() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }
}

fn missing(id: RingVertexId) -> SkeletonError {
    SkeletonError::InvalidTopology(format!("ring vertex {id:?} not found"))
}

impl<T> RingStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live vertices across all rings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if `id` names a live vertex.
    #[must_use]
    pub fn contains(&self, id: RingVertexId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Links `items` into a new closed ring and returns the id of the first
    /// vertex, or `None` if `items` is empty.
    pub fn insert_ring(&mut self, items: impl IntoIterator<Item = T>) -> Option<RingVertexId> {
        let mut first: Option<RingVertexId> = None;
        let mut last: Option<RingVertexId> = None;
        for data in items {
            let id = self.nodes.insert_with_key(|k| RingNode {
                data,
                prev: k,
                next: k,
            });
            if let (Some(f), Some(l)) = (first, last) {
                self.nodes[l].next = id;
                self.nodes[id].prev = l;
                self.nodes[id].next = f;
                self.nodes[f].prev = id;
            } else {
                first = Some(id);
            }
            last = Some(id);
        }
        first
    }

    /// # Errors
    ///
    /// Returns an error if the vertex is not in the store.
    pub fn get(&self, id: RingVertexId) -> Result<&T, SkeletonError> {
        self.nodes.get(id).map(|n| &n.data).ok_or_else(|| missing(id))
    }

    /// # Errors
    ///
    /// Returns an error if the vertex is not in the store.
    pub fn get_mut(&mut self, id: RingVertexId) -> Result<&mut T, SkeletonError> {
        self.nodes
            .get_mut(id)
            .map(|n| &mut n.data)
            .ok_or_else(|| missing(id))
    }

    /// # Errors
    ///
    /// Returns an error if the vertex is not in the store.
    pub fn next(&self, id: RingVertexId) -> Result<RingVertexId, SkeletonError> {
        self.nodes.get(id).map(|n| n.next).ok_or_else(|| missing(id))
    }

    /// # Errors
    ///
    /// Returns an error if the vertex is not in the store.
    pub fn prev(&self, id: RingVertexId) -> Result<RingVertexId, SkeletonError> {
        self.nodes.get(id).map(|n| n.prev).ok_or_else(|| missing(id))
    }

    /// Inserts `data` between `at` and its successor.
    ///
    /// # Errors
    ///
    /// Returns an error if `at` is not in the store.
    pub fn insert_after(&mut self, at: RingVertexId, data: T) -> Result<RingVertexId, SkeletonError> {
        let next = self.next(at)?;
        let id = self.nodes.insert(RingNode {
            data,
            prev: at,
            next,
        });
        self.nodes[at].next = id;
        self.nodes[next].prev = id;
        Ok(id)
    }

    /// Inserts `data` between the predecessor of `at` and `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if `at` is not in the store.
    pub fn insert_before(&mut self, at: RingVertexId, data: T) -> Result<RingVertexId, SkeletonError> {
        let prev = self.prev(at)?;
        self.insert_after(prev, data)
    }

    /// Unlinks and removes a vertex, closing the gap between its neighbours.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex is not in the store.
    pub fn remove(&mut self, id: RingVertexId) -> Result<T, SkeletonError> {
        let node = self.nodes.remove(id).ok_or_else(|| missing(id))?;
        if node.next != id {
            self.nodes[node.prev].next = node.next;
            self.nodes[node.next].prev = node.prev;
        }
        Ok(node.data)
    }

    /// Unlinks a vertex from its ring but keeps it in the store as a ring of
    /// its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex is not in the store.
    pub fn detach(&mut self, id: RingVertexId) -> Result<(), SkeletonError> {
        let prev = self.prev(id)?;
        let next = self.next(id)?;
        if next != id {
            self.nodes[prev].next = next;
            self.nodes[next].prev = prev;
            self.nodes[id].prev = id;
            self.nodes[id].next = id;
        }
        Ok(())
    }

    /// Exchanges the successors of `a` and `b`.
    ///
    /// When both lie on one ring this cuts it in two; when they lie on
    /// different rings it joins them into one.
    ///
    /// # Errors
    ///
    /// Returns an error if either vertex is not in the store.
    pub fn swap_next(&mut self, a: RingVertexId, b: RingVertexId) -> Result<(), SkeletonError> {
        if a == b {
            return Ok(());
        }
        let an = self.next(a)?;
        let bn = self.next(b)?;
        self.nodes[a].next = bn;
        self.nodes[bn].prev = a;
        self.nodes[b].next = an;
        self.nodes[an].prev = b;
        Ok(())
    }

    /// Walks the ring containing `start`, beginning at `start`.
    #[must_use]
    pub fn cycle(&self, start: RingVertexId) -> RingCycle<'_, T> {
        RingCycle {
            store: self,
            start,
            current: self.contains(start).then_some(start),
        }
    }

    /// Number of vertices on the ring containing `start`.
    #[must_use]
    pub fn ring_len(&self, start: RingVertexId) -> usize {
        self.cycle(start).count()
    }

    /// All vertex ids in arena order.
    pub fn ids(&self) -> impl Iterator<Item = RingVertexId> + '_ {
        self.nodes.keys()
    }

    /// One representative id per ring, in arena order of the first vertex
    /// met on each ring.
    #[must_use]
    pub fn ring_starts(&self) -> Vec<RingVertexId> {
        let mut seen = slotmap::SecondaryMap::<RingVertexId, ()>::new();
        let mut starts = Vec::new();
        for id in self.nodes.keys() {
            if seen.contains_key(id) {
                continue;
            }
            starts.push(id);
            for v in self.cycle(id) {
                seen.insert(v, ());
            }
        }
        starts
    }
}

/// Iterator over the vertex ids of one ring.
pub struct RingCycle<'a, T> {
    store: &'a RingStore<T>,
    start: RingVertexId,
    current: Option<RingVertexId>,
}

impl<T> Iterator for RingCycle<'_, T> {
    type Item = RingVertexId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let next = self.store.nodes.get(id)?.next;
        self.current = (next != self.start).then_some(next);
        Some(id)
    }
}
