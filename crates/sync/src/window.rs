use std::collections::BTreeSet;

/// Default number of unacknowledged `BLOCK_DATA` chunks allowed in flight.
pub const DEFAULT_WINDOW_SIZE: u32 = 32;

/// Bounds how many chunks of one transfer may be unacknowledged at once.
///
/// The sender calls [`admit_next`](Self::admit_next) in a loop to fill the
/// window, sends whatever it returns, and calls [`ack`](Self::ack) as
/// `BLOCK_ACK`s arrive. This keeps at most `window_size` chunks in flight
/// regardless of how fast the receiver acknowledges them, bounding memory
/// use on a fast sender talking to a slow receiver.
#[derive(Clone, Debug)]
pub struct SlidingWindow {
    total_chunks: u32,
    window_size: u32,
    next_to_send: u32,
    in_flight: BTreeSet<u32>,
}

impl SlidingWindow {
    /// Creates a window for a transfer of `total_chunks` chunks, admitting
    /// at most `window_size` unacknowledged chunks at once.
    #[must_use]
    pub fn new(total_chunks: u32, window_size: u32) -> Self {
        Self {
            total_chunks,
            window_size: window_size.max(1),
            next_to_send: 0,
            in_flight: BTreeSet::new(),
        }
    }

    /// Returns the next chunk index to send and marks it in flight, or
    /// `None` if the window is full or every chunk has already been sent.
    pub fn admit_next(&mut self) -> Option<u32> {
        if self.in_flight.len() as u32 >= self.window_size || self.next_to_send >= self.total_chunks {
            return None;
        }
        let index = self.next_to_send;
        self.next_to_send += 1;
        self.in_flight.insert(index);
        Some(index)
    }

    /// Acknowledges a chunk, freeing a window slot. Returns `true` if the
    /// chunk was actually in flight (a duplicate or unknown ack returns
    /// `false` and has no effect).
    pub fn ack(&mut self, chunk_index: u32) -> bool {
        self.in_flight.remove(&chunk_index)
    }

    /// `true` once every chunk has been sent and acknowledged.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next_to_send >= self.total_chunks && self.in_flight.is_empty()
    }

    /// Number of chunks currently unacknowledged.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}
