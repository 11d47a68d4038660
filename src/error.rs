//! Typed error kinds for the cursor codec/render core.
//!
//! CLI glue (`src/bin/*.rs`) and filesystem helpers keep using [`anyhow`] the
//! way the rest of this codebase always has; this enum exists because a few
//! callers (the dump dispatcher, builder lifecycle, template expander) need
//! to match on *which* failure happened rather than just display it.

use std::path::PathBuf;

/// Errors produced by the codec, model, render, dump and template layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad CLI args, an invalid frame number for an animated cursor,
    /// or a nonexistent source directory.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Fewer bytes were available than a decoder asked for.
    #[error("unexpected end of data while reading {context}")]
    UnexpectedEnd {
        /// What was being read when the data ran out.
        context: String,
    },

    /// A structural fault in a binary decoder.
    #[error("invalid data in {where_}: {why}")]
    InvalidData {
        /// Where the fault was found (chunk/field name).
        where_: String,
        /// Why it's considered invalid.
        why: String,
    },

    /// The dump dispatcher found no provider for a file.
    #[error("unsupported format for {path}")]
    UnsupportedFormat {
        /// The file that no decoder claimed.
        path: PathBuf,
    },

    /// A template variable referenced itself, directly or transitively.
    #[error("circular reference while expanding template variable {var}")]
    CircularReference {
        /// The variable name at which the cycle was detected.
        var: String,
    },

    /// An underlying read/write failed.
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    /// A second `build()` call, or `add_frame` after `build()`.
    #[error("builder already finalized")]
    BuilderFinalized,
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::InvalidData`].
    pub fn invalid_data(where_: impl Into<String>, why: impl Into<String>) -> Self {
        Self::InvalidData {
            where_: where_.into(),
            why: why.into(),
        }
    }

    /// Shorthand for [`Error::UnexpectedEnd`].
    pub fn unexpected_end(context: impl Into<String>) -> Self {
        Self::UnexpectedEnd {
            context: context.into(),
        }
    }
}
