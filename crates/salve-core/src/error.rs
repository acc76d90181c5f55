//! # Error Types
//!
//! Errors raised while loading symbol information.
//!
//! The capture/resolve/format pipeline never hands these to its callers: a
//! module that cannot be read or parsed simply yields unresolved frames. The
//! errors exist so the loading code can use `?` and so the reason ends up in
//! the log. We use `thiserror` to generate the `Error` implementations.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for symbol loading and the CLI
#[derive(Error, Debug)]
pub enum SalveError
{
    /// The object file exists but its format could not be parsed
    ///
    /// This happens for stripped or truncated files, or for formats the
    /// `object` crate does not understand.
    #[error("Failed to parse object file {path}: {reason}")]
    ObjectParse
    {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// A section could not be read or decompressed
    #[error("Failed to read section {section}: {reason}")]
    Section
    {
        /// Section name (e.g. `.debug_info`)
        section: String,
        /// Underlying error message
        reason: String,
    },

    /// The DWARF data is present but malformed
    #[error("DWARF error while {context}: {source}")]
    Dwarf
    {
        /// What was being loaded when the error occurred
        context: &'static str,
        /// The error reported by `gimli`
        #[source]
        source: gimli::Error,
    },

    /// The image has no loadable segment to anchor addresses against
    #[error("No loadable segment in {0}")]
    NoLoadableSegment(PathBuf),

    /// Invalid argument passed to a public helper
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (reading object files, files to dump, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SalveError>`
///
/// ```rust
/// use salve_core::error::SalveResult;
/// fn foo() -> SalveResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type SalveResult<T> = std::result::Result<T, SalveError>;
