//! Fixed-capacity circular store of framed elements
//!
//! The ring holds `N` preallocated slots, each large enough for one
//! element of up to `max_element_size` bytes. An element is framed by the
//! slot's `len` field rather than a cast byte header: the structured
//! `(len, payload)` pair replaces pointer arithmetic over a raw byte
//! array.
//!
//! The ring performs no occupancy accounting of its own. Callers must
//! only `push_frame` into a slot known to be free and `pop_frame` from a
//! slot known to be full; the flow-control permits in
//! [`crate::device::FifoDevice`] provide exactly that guarantee.

/// One fixed-size storage unit holding at most one framed element.
#[derive(Debug)]
struct Slot {
    /// Stored element length in bytes; meaningful only while the slot is
    /// full.
    len: usize,
    /// Payload storage, `max_element_size` bytes, allocated once.
    data: Box<[u8]>,
}

impl Slot {
    fn new(max_element_size: usize) -> Self {
        Self {
            len: 0,
            data: vec![0u8; max_element_size].into_boxed_slice(),
        }
    }
}

/// Circular buffer of `N` framed slots with two slot-index cursors.
///
/// `end` marks the next slot to fill, `start` the next slot to drain.
/// Both advance modulo `N`.
#[derive(Debug)]
pub struct RingBuffer {
    slots: Box<[Slot]>,
    /// Next slot to drain.
    start: usize,
    /// Next slot to fill.
    end: usize,
    max_element_size: usize,
}

impl RingBuffer {
    /// Allocate a ring of `slots` slots of `max_element_size` bytes each.
    ///
    /// Sizing validation happens in the device constructor; both values
    /// must be non-zero here.
    pub fn new(slots: usize, max_element_size: usize) -> Self {
        debug_assert!(slots >= 1);
        debug_assert!(max_element_size >= 1);
        Self {
            slots: (0..slots).map(|_| Slot::new(max_element_size)).collect(),
            start: 0,
            end: 0,
            max_element_size,
        }
    }

    /// Number of slots (N).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Maximum element payload size in bytes.
    pub fn max_element_size(&self) -> usize {
        self.max_element_size
    }

    /// Store one element at the `end` cursor and advance it with
    /// wraparound.
    ///
    /// Copies `min(payload.len(), max_element_size)` bytes; any excess is
    /// silently truncated (deliberate policy, not an error). Returns the
    /// count actually stored.
    ///
    /// The caller must hold a free-slot permit for the target slot.
    pub fn push_frame(&mut self, payload: &[u8]) -> usize {
        let stored = payload.len().min(self.max_element_size);
        let slot = &mut self.slots[self.end];
        slot.data[..stored].copy_from_slice(&payload[..stored]);
        slot.len = stored;
        self.end = (self.end + 1) % self.slots.len();
        stored
    }

    /// Copy the element at the `start` cursor out and advance it with
    /// wraparound.
    ///
    /// Copies `min(out.len(), stored_len)` bytes: a smaller caller buffer
    /// receives a silently truncated prefix, a larger one receives only
    /// the element's true length. Returns the count delivered.
    ///
    /// The caller must hold a filled-slot permit for the source slot.
    pub fn pop_frame(&mut self, out: &mut [u8]) -> usize {
        let slot = &mut self.slots[self.start];
        let delivered = out.len().min(slot.len);
        out[..delivered].copy_from_slice(&slot.data[..delivered]);
        slot.len = 0;
        self.start = (self.start + 1) % self.slots.len();
        delivered
    }
}
