//! # salve-core
//!
//! In-process stack capture, symbolication and debugging aids.
//!
//! The crate is a three-stage pipeline:
//!
//! 1. [`unwind`]: capture the current thread's call chain as raw addresses
//! 2. [`symbols`]: resolve each address to a function name and source
//!    position, through one process-wide session
//! 3. [`formatter`]: render the resolved frames through a line template
//!
//! [`formatter::stacktrace`] runs all three in one call.
//!
//! Alongside the pipeline live a few debugging aids: a [`diagnostics`] sink
//! for warnings, failures and assertions, [`hexdump`] and [`human`] units.
//!
//! ## Platform Support
//!
//! - **Linux / macOS / BSDs**: native unwinding, module lookup through
//!   `dladdr(3)`, DWARF line tables or the symbol table of each module
//! - **Windows**: native unwinding; frames render as `????`
//! - **wasm**: captures are always empty
//!
//! Nothing in the pipeline returns an error to the caller. Missing
//! information degrades to fewer frames or to `????` placeholders.
//!
//! ## Why unsafe code is needed
//!
//! Asking the dynamic loader which module owns an address goes through
//! `dladdr`, a C API. The call is wrapped in [`symbols::module_for_address`].

#![allow(unsafe_code)] // Required for dladdr

mod macros;

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod formatter;
pub mod hexdump;
pub mod human;
pub mod prelude;
pub mod symbols;
pub mod types;
pub mod unwind;

// Re-export commonly used items
pub use error::{SalveError, SalveResult};
pub use formatter::{format, format_lines, render, stacktrace, DEFAULT_TEMPLATE};
pub use symbols::{demangle, resolve, resolve_address};
pub use types::{Address, CapturedStack, ResolvedFrame};
pub use unwind::capture;
