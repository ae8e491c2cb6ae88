//! Stream error codes.
//!
//! Every completion delivered by the stream core carries either a success
//! payload or one of these errors. No other error values are produced.

/// Errors surfaced through stream completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A matched send was longer than the receive buffer's capacity.
    BufferTooSmall,
    /// The principal on the other side of a completion has gone away.
    ThreadExited,
    /// The item's own lane was closed while the item was parked.
    ClosedLocally,
    /// The peer's lane broke before a partner arrived.
    ClosedRemotely,
}

impl Error {
    /// Get the error name as a string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Error::BufferTooSmall => "buffer-too-small",
            Error::ThreadExited => "thread-exited",
            Error::ClosedLocally => "closed-locally",
            Error::ClosedRemotely => "closed-remotely",
        }
    }
}
