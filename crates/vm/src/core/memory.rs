use alloy::primitives::U256;

/// The [`Memory`] struct represents the byte-addressable memory of a call frame.
///
/// Memory only grows, in 32 byte words, and only after the expansion was paid for. The cost of
/// the largest expansion so far is remembered so that later expansions are billed for the
/// difference only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    store: Vec<u8>,
    last_energy_cost: u64,
}

impl Memory {
    /// Creates a new, empty [`Memory`].
    pub fn new() -> Memory {
        Memory { store: Vec::with_capacity(4096), last_energy_cost: 0 }
    }

    /// Gets the current size of the memory in bytes.
    ///
    /// ```
    /// use cvm_vm::core::memory::Memory;
    ///
    /// let memory = Memory::new();
    /// assert_eq!(memory.len(), 0);
    /// ```
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no memory has been allocated yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The raw memory contents.
    pub fn data(&self) -> &[u8] {
        &self.store
    }

    /// Grows the memory to `size` bytes. Never shrinks.
    ///
    /// ```
    /// use cvm_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.resize(64);
    /// assert_eq!(memory.len(), 64);
    /// memory.resize(32);
    /// assert_eq!(memory.len(), 64);
    /// ```
    pub fn resize(&mut self, size: u64) {
        let size = size as usize;
        if self.store.len() < size {
            self.store.resize(size, 0);
        }
    }

    /// Copies `value` into `[offset, offset + size)`. When `value` is shorter than `size`, the
    /// remaining bytes are left untouched.
    ///
    /// ```
    /// use cvm_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.resize(32);
    /// memory.set(0, 4, &[0xff; 8]);
    /// assert_eq!(memory.get_copy(0, 5), vec![0xff, 0xff, 0xff, 0xff, 0x00]);
    /// ```
    pub fn set(&mut self, offset: u64, size: u64, value: &[u8]) {
        if size == 0 {
            return;
        }
        let offset = offset as usize;
        let size = size as usize;
        if self.store.len() < offset + size {
            self.resize((offset + size) as u64);
        }
        let n = size.min(value.len());
        self.store[offset..offset + n].copy_from_slice(&value[..n]);
    }

    /// Writes `value` as a big-endian 32 byte word at `offset`.
    pub fn set32(&mut self, offset: u64, value: U256) {
        self.set(offset, 32, &value.to_be_bytes::<32>());
    }

    /// Writes a single byte at `offset`.
    pub fn set_byte(&mut self, offset: u64, value: u8) {
        self.set(offset, 1, &[value]);
    }

    /// Returns a copy of `[offset, offset + size)`, zero filled past the end of memory.
    pub fn get_copy(&self, offset: u64, size: u64) -> Vec<u8> {
        if size == 0 {
            return Vec::new();
        }
        let mut out = vec![0u8; size as usize];
        let offset = offset as usize;
        if offset < self.store.len() {
            let end = (offset + size as usize).min(self.store.len());
            out[..end - offset].copy_from_slice(&self.store[offset..end]);
        }
        out
    }

    /// Returns a view of `[offset, offset + size)`. The range must already be allocated;
    /// anything past the end of memory is cut off.
    pub fn get_ptr(&self, offset: u64, size: u64) -> &[u8] {
        if size == 0 {
            return &[];
        }
        let start = (offset as usize).min(self.store.len());
        let end = (offset as usize).saturating_add(size as usize).min(self.store.len());
        &self.store[start..end]
    }

    /// The total expansion cost charged so far.
    pub fn last_energy_cost(&self) -> u64 {
        self.last_energy_cost
    }

    pub(crate) fn set_last_energy_cost(&mut self, cost: u64) {
        self.last_energy_cost = cost;
    }
}

/// Returns the number of 32 byte words needed to hold `size` bytes.
///
/// ```
/// use cvm_vm::core::memory::to_word_size;
///
/// assert_eq!(to_word_size(0), 0);
/// assert_eq!(to_word_size(33), 2);
/// assert_eq!(to_word_size(u64::MAX), u64::MAX / 32 + 1);
/// ```
pub fn to_word_size(size: u64) -> u64 {
    if size > u64::MAX - 31 {
        return u64::MAX / 32 + 1;
    }
    (size + 31) / 32
}

/// Returns `size` bytes of `data` starting at `start`, zero padded on the right when the range
/// runs past the end.
pub fn get_data(data: &[u8], start: u64, size: u64) -> Vec<u8> {
    let len = data.len() as u64;
    let start = start.min(len);
    let end = start.saturating_add(size).min(len);

    let mut out = vec![0u8; size as usize];
    out[..(end - start) as usize].copy_from_slice(&data[start as usize..end as usize]);
    out
}
