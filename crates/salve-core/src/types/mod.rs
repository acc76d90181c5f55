//! # Types
//!
//! Platform-agnostic types shared by every stage of the pipeline.
//!
//! Addresses come out of the unwinder, symbols come out of the resolver and
//! the formatter only ever sees [`ResolvedFrame`]s, so none of these types
//! know which platform produced them.

pub mod address;
pub mod stack;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use stack::{CapturedStack, ResolvedFrame, DEFAULT_CAPACITY, INLINE_FRAMES, SENTINEL};
pub use symbols::{SourceLocation, Symbol, SymbolLanguage, SymbolName};
