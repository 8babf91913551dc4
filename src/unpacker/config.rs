//! Configuration for [`Unpacker`](super::Unpacker) reassembly buffers.

/// Default capacity reserved for the reassembly buffer.
pub const DEFAULT_INITIAL_CAPACITY: usize = 4 * 1024;

/// Reassembly settings.
///
/// # Examples
///
/// ```
/// use bytesio::unpacker::UnpackerConfig;
///
/// let config = UnpackerConfig::default().max_buffered(64 * 1024);
/// assert_eq!(config.max_buffered_value(), Some(64 * 1024));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnpackerConfig {
    initial_capacity: usize,
    max_buffered: Option<usize>,
}

impl Default for UnpackerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_buffered: None,
        }
    }
}

impl UnpackerConfig {
    /// Bytes reserved up front for the reassembly buffer.
    #[must_use]
    pub fn initial_capacity(mut self, bytes: usize) -> Self {
        self.initial_capacity = bytes;
        self
    }

    /// Cap on bytes held while waiting for a frame to complete.
    ///
    /// When the buffer grows past the cap without yielding a frame the
    /// pending bytes are discarded and
    /// [`UnpackError::BufferOverflow`](super::UnpackError::BufferOverflow) is
    /// reported. Unbounded by default.
    #[must_use]
    pub fn max_buffered(mut self, bytes: usize) -> Self {
        self.max_buffered = Some(bytes);
        self
    }

    /// Configured initial capacity.
    #[must_use]
    pub fn initial_capacity_value(&self) -> usize { self.initial_capacity }

    /// Configured buffering cap, if any.
    #[must_use]
    pub fn max_buffered_value(&self) -> Option<usize> { self.max_buffered }
}
