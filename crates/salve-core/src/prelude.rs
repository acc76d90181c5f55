//! Common module for library exports

pub use crate::diagnostics::{is_asserting, is_debug, is_release, Diagnostics, Notifier};
pub use crate::error::{SalveError, SalveResult};
pub use crate::formatter::{format, format_lines, render, stacktrace, DEFAULT_TEMPLATE};
pub use crate::symbols::{demangle, resolve, resolve_address, SymbolAvailability, SymbolSource};
pub use crate::types::{Address, CapturedStack, ResolvedFrame, Symbol};
pub use crate::unwind::{capture, capture_default};
pub use crate::{salve_assert, salve_assert_op};
