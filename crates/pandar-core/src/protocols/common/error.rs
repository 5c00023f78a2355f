use thiserror::Error;

/// Failure reported by [`super::ByteCursor`] when a read would leave the buffer.
///
/// # Examples
/// ```
/// use pandar_core::CursorError;
///
/// let err = CursorError::Overrun { offset: 4, needed: 2, remaining: 1 };
/// assert!(err.to_string().contains("read past end"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("read past end at offset {offset}: need {needed} bytes, {remaining} remaining")]
    Overrun {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
}
