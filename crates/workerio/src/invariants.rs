//! Debug assertion macros for adapter invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so release
//! builds pay nothing for them.

// =============================================================================
// Bounded single-message reads
// =============================================================================

/// Assert that a read returned a non-empty prefix of exactly one buffered
/// message, no longer than the caller asked for.
///
/// **Invariant**: `0 < taken ≤ min(max_len, front_message_len)`
///
/// Used in: `MessageReader::poll_read_chunk()` when serving from the buffer
macro_rules! debug_assert_bounded_read {
    ($taken:expr, $max_len:expr, $front_len:expr) => {
        debug_assert!(
            $taken > 0 && $taken <= $max_len && $taken <= $front_len,
            "bounded read violated: took {} bytes (max {}, message had {})",
            $taken,
            $max_len,
            $front_len
        )
    };
}

// =============================================================================
// No buffering after a terminal state
// =============================================================================

/// Assert that an inbound message is only buffered while the reader is open.
///
/// **Invariant**: `buffered(message) → state == Open`
///
/// Used in: the reader's port listener
macro_rules! debug_assert_buffering_open {
    ($state:expr) => {
        debug_assert!(
            $state.is_open(),
            "message buffered after close/error (state {:?})",
            $state
        )
    };
}

// =============================================================================
// Listener released on dispose
// =============================================================================

/// Assert that disposal left no listener registered.
///
/// **Invariant**: `dispose() → listener == None`
///
/// Used in: `MessageReader::dispose()`
macro_rules! debug_assert_listener_released {
    ($listener:expr) => {
        debug_assert!(
            $listener.is_none(),
            "reader disposed but its port listener is still registered"
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_bounded_read;
pub(crate) use debug_assert_buffering_open;
pub(crate) use debug_assert_listener_released;
