//! §7 / §10.3 — the two-level error hierarchy: an outer [`Bor1Error`]
//! distinguishing argument-shape problems from format problems, and an
//! inner [`ScriptError`] enumerating the specific format violation.
//!
//! `ScriptError`'s `Display` text is pinned to the exact wording of §7 so
//! that callers matching on message text (as the scripting layer this was
//! distilled from does) keep working against this implementation too.

use thiserror::Error;

use bor1_core::CoreError;

/// Top-level error returned by [`crate::serialize`] and
/// [`crate::unserialize`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Bor1Error {
    /// The argument did not have the shape the operation requires (`block`
    /// for `serialize`, `binary` for `unserialize`).
    #[error("{0}")]
    Type(String),
    /// The input bytes violate the wire format.
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// The specific format violation behind a [`Bor1Error::Script`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// Bad magic, truncated header, or a root `BKIND` byte that isn't
    /// `BLOCK` (§4.7).
    #[error("Invalid serialized data header")]
    BadHeader,
    /// The cursor ran out of bytes while reading a primitive, a cell, or a
    /// buffer payload.
    #[error("Unexpected end of serialized data")]
    UnexpectedEof,
    /// A cell's kind byte or range-mode byte was out of range (§4.8).
    #[error("Invalid serialized block")]
    InvalidBlock,
    /// A buffer's `BKIND` byte did not name one of the eleven valid buffer
    /// kinds (§4.6, §4.10).
    #[error("Invalid serialized buffer type ({0})")]
    InvalidBufferKind(u8),
}

impl From<CoreError> for ScriptError {
    fn from(_: CoreError) -> Self {
        ScriptError::UnexpectedEof
    }
}
