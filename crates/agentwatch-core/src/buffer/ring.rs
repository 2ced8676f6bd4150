use parking_lot::RwLock;

/// Fixed-capacity circular byte buffer keeping the most recent bytes of a stream
///
/// Writes never block on space and never fail: once the buffer is full every
/// new byte evicts the oldest one. Readers get copies, so callers can never
/// corrupt the internal state.
pub struct RingBuffer {
    inner: RwLock<Ring>,
}

struct Ring {
    data: Box<[u8]>,
    /// Index of the oldest byte
    start: usize,
    /// Index where the next byte goes
    end: usize,
    /// Stays true until reset
    full: bool,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else if self.end >= self.start {
            self.end - self.start
        } else {
            self.capacity() - self.start + self.end
        }
    }

    fn reset(&mut self) {
        self.start = 0;
        self.end = 0;
        self.full = false;
    }

    fn write(&mut self, bytes: &[u8]) {
        let cap = self.capacity();
        if cap == 0 || bytes.is_empty() {
            return;
        }
        // Only the trailing `cap` bytes can survive
        let bytes = &bytes[bytes.len().saturating_sub(cap)..];
        for &b in bytes {
            self.data[self.end] = b;
            self.end = (self.end + 1) % cap;
            if self.full {
                self.start = self.end;
            } else if self.end == self.start {
                self.full = true;
            }
        }
    }

    fn to_vec(&self) -> Vec<u8> {
        let len = self.len();
        let mut out = Vec::with_capacity(len);
        if len == 0 {
            return out;
        }
        if self.start < self.end {
            out.extend_from_slice(&self.data[self.start..self.end]);
        } else {
            out.extend_from_slice(&self.data[self.start..]);
            out.extend_from_slice(&self.data[..self.end]);
        }
        out
    }
}

impl RingBuffer {
    /// Create a buffer retaining at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Ring {
                data: vec![0; capacity].into_boxed_slice(),
                start: 0,
                end: 0,
                full: false,
            }),
        }
    }

    /// Append bytes, evicting the oldest ones when full
    ///
    /// Always reports `bytes.len()` as written, even when older data (or the
    /// head of `bytes` itself) was evicted.
    pub fn write(&self, bytes: &[u8]) -> usize {
        self.inner.write().write(bytes);
        bytes.len()
    }

    /// Copy of the contents, oldest byte first
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.read().to_vec()
    }

    /// Number of bytes currently held
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }

    /// Clear the contents, keeping the allocation
    pub fn reset(&self) {
        self.inner.write().reset();
    }

    /// Reset and write in one critical section
    ///
    /// Readers see either the old or the new contents, never an empty buffer
    /// in between.
    pub fn replace_with(&self, bytes: &[u8]) -> usize {
        let mut ring = self.inner.write();
        ring.reset();
        ring.write(bytes);
        bytes.len()
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.inner.read();
        f.debug_struct("RingBuffer")
            .field("capacity", &ring.capacity())
            .field("len", &ring.len())
            .field("full", &ring.full)
            .finish()
    }
}
