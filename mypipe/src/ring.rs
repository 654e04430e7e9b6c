//! Circular byte storage
//!
//! Fixed-size byte array plus the cursor arithmetic the pipe runs inside its
//! critical section. Nothing here locks or blocks.
//!
//! # Layout
//!
//! ```text
//!  start < end            start > end (wrapped)
//!  .....s#####e.....      #####e.....s#####
//! ```
//!
//! `#` is occupied, `.` is free. When `start == end` the buffer is either
//! empty or full; the occupied count in [`Cursors::len`] tells which.
//!
//! A transfer is planned first and committed later, so a copy that faults
//! between the two leaves the cursors where they were.

use std::ops::Range;

use crate::region::{DestRegion, RegionFault, SourceRegion};

/// Which way bytes move through the storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Caller bytes go into free space (write)
    Fill,
    /// Occupied bytes go out to the caller (read)
    Drain,
}

/// Position of the occupied region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursors {
    /// Next byte to read
    pub start: usize,
    /// Next byte to write
    pub end: usize,
    /// Occupied bytes
    pub len: usize,
}

impl Cursors {
    /// Cursors after `plan` has been carried out on a buffer of `capacity` bytes
    #[must_use]
    pub fn advance(self, plan: &Plan, capacity: usize) -> Self {
        let moved = plan.len();
        match plan.direction {
            Direction::Fill => Self {
                end: (self.end + moved) % capacity,
                len: self.len + moved,
                ..self
            },
            Direction::Drain => Self {
                start: (self.start + moved) % capacity,
                len: self.len - moved,
                ..self
            },
        }
    }
}

/// Storage ranges touched by one transfer
///
/// `head` starts at the current cursor and never crosses the end of the
/// array; `tail` continues from offset 0 when the transfer wraps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub direction: Direction,
    pub head: Range<usize>,
    pub tail: Range<usize>,
    /// Bytes the caller asked for
    pub requested: usize,
}

impl Plan {
    /// Bytes that will actually move
    #[must_use]
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when fewer bytes move than were requested
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.len() < self.requested
    }

    #[must_use]
    pub fn wraps(&self) -> bool {
        !self.tail.is_empty()
    }

    /// Non-empty `(caller_offset, storage_range)` pairs in transfer order
    pub fn segments(&self) -> impl Iterator<Item = (usize, Range<usize>)> {
        [(0, self.head.clone()), (self.head.len(), self.tail.clone())]
            .into_iter()
            .filter(|(_, range)| !range.is_empty())
    }
}

/// Plan a transfer of up to `requested` bytes
///
/// The result covers `min(requested, available)` bytes, where `available` is
/// free space for [`Direction::Fill`] and occupied space for
/// [`Direction::Drain`].
#[must_use]
pub fn plan(cursors: Cursors, capacity: usize, requested: usize, direction: Direction) -> Plan {
    let (from, available) = match direction {
        Direction::Fill => (cursors.end, capacity - cursors.len),
        Direction::Drain => (cursors.start, cursors.len),
    };
    let count = requested.min(available);
    let rear = count.min(capacity - from);
    Plan {
        direction,
        head: from..from + rear,
        tail: 0..count - rear,
        requested,
    }
}

/// Fixed-capacity circular byte buffer
pub struct Ring {
    storage: Box<[u8]>,
    cursors: Cursors,
}

impl Ring {
    /// Create a zeroed ring
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            cursors: Cursors::default(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn cursors(&self) -> Cursors {
        self.cursors
    }

    /// Occupied bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len
    }

    /// Free bytes
    #[must_use]
    pub fn free(&self) -> usize {
        self.capacity() - self.cursors.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cursors.len == self.capacity()
    }

    #[must_use]
    pub fn plan(&self, requested: usize, direction: Direction) -> Plan {
        plan(self.cursors, self.capacity(), requested, direction)
    }

    /// Copy the bytes of a `Fill` plan from `src` into storage
    ///
    /// Cursors are untouched; call [`Ring::commit`] afterwards.
    ///
    /// # Errors
    /// Returns the first [`RegionFault`] reported by `src`.
    pub fn fill<S: SourceRegion + ?Sized>(&mut self, plan: &Plan, src: &S) -> Result<(), RegionFault> {
        debug_assert_eq!(plan.direction, Direction::Fill);
        for (offset, range) in plan.segments() {
            #[allow(clippy::indexing_slicing)]
            src.copy_out(offset, &mut self.storage[range])?;
        }
        Ok(())
    }

    /// Copy the bytes of a `Drain` plan from storage into `dst`
    ///
    /// # Errors
    /// Returns the first [`RegionFault`] reported by `dst`.
    pub fn drain<D: DestRegion + ?Sized>(&self, plan: &Plan, dst: &mut D) -> Result<(), RegionFault> {
        debug_assert_eq!(plan.direction, Direction::Drain);
        for (offset, range) in plan.segments() {
            #[allow(clippy::indexing_slicing)]
            dst.copy_in(offset, &self.storage[range])?;
        }
        Ok(())
    }

    /// Advance the cursors past a plan whose copy succeeded
    pub fn commit(&mut self, plan: &Plan) {
        self.cursors = self.cursors.advance(plan, self.capacity());
    }
}

impl std::fmt::Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("capacity", &self.capacity())
            .field("start", &self.cursors.start)
            .field("end", &self.cursors.end)
            .field("len", &self.cursors.len)
            .finish_non_exhaustive()
    }
}
