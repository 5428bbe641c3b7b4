//! Frame slot bookkeeping.
//!
//! The CPU is allowed to record at most [`FRAMES_IN_FLIGHT`] frames ahead of
//! the GPU. [`FrameCursor`] tracks which slot the next frame will use; it is
//! pure bookkeeping with no Vulkan state, which keeps the wraparound
//! arithmetic testable on its own.

/// Number of frames the CPU may record ahead of the GPU.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Cursor over the frame slots.
///
/// Advances by one after every presented frame and wraps around at
/// [`FRAMES_IN_FLIGHT`]. The slot index is independent of the swapchain
/// image index returned by acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCursor {
    index: usize,
}

impl FrameCursor {
    /// Creates a cursor pointing at slot 0.
    pub fn new() -> Self {
        Self { index: 0 }
    }

    /// Returns the current slot index, always less than [`FRAMES_IN_FLIGHT`].
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves the cursor to the next slot, wrapping around.
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % FRAMES_IN_FLIGHT;
    }
}

impl Default for FrameCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_starts_at_zero() {
        assert_eq!(FrameCursor::new().index(), 0);
    }

    #[test]
    fn test_cursor_wraps_around() {
        let mut cursor = FrameCursor::new();
        cursor.advance();
        assert_eq!(cursor.index(), 1);
        cursor.advance();
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_cursor_after_five_frames() {
        let mut cursor = FrameCursor::new();
        for _ in 0..5 {
            cursor.advance();
        }
        assert_eq!(cursor.index(), 1);
    }

    #[test]
    fn test_cursor_index_stays_in_bounds() {
        let mut cursor = FrameCursor::new();
        for n in 1..=100 {
            cursor.advance();
            assert!(cursor.index() < FRAMES_IN_FLIGHT);
            assert_eq!(cursor.index(), n % FRAMES_IN_FLIGHT);
        }
    }
}
