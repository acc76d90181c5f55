//! Assertion macros reporting through a [`Diagnostics`](crate::diagnostics::Diagnostics) sink.
//!
//! Both macros only check their condition when the calling crate is built
//! with `debug_assertions`. A failure is reported as
//!
//! ```text
//! Assertion failed at FILE:LINE
//!     <expression>
//!     <values>
//!     (false)
//!     <description>
//! ```
//!
//! with tabs for indentation. Execution continues afterwards.

/// Check a boolean condition.
///
/// ```rust
/// use salve_core::diagnostics::Diagnostics;
/// use salve_core::salve_assert;
///
/// let sink = Diagnostics::new();
/// sink.set_assert_hook(|_, _, _| {});
/// let items = vec![1, 2, 3];
/// salve_assert!(sink, !items.is_empty());
/// salve_assert!(sink, items.len() == 3, "three items expected");
/// ```
#[macro_export]
macro_rules! salve_assert {
    ($sink:expr, $cond:expr $(,)?) => {
        $crate::salve_assert!($sink, $cond, "")
    };
    ($sink:expr, $cond:expr, $desc:expr $(,)?) => {
        if cfg!(debug_assertions) {
            let value: bool = $cond;
            if !value {
                let message = format!(
                    "Assertion failed at {}:{}\n\t{}\n\t{}\n\t(false)\n\t{}",
                    file!(),
                    line!(),
                    stringify!($cond),
                    value,
                    $desc
                );
                ($sink).assertion_failed(&message, file!(), line!());
            }
        }
    };
}

/// Check `a <op> b`, reporting both operands on failure.
///
/// ```rust
/// use salve_core::diagnostics::Diagnostics;
/// use salve_core::salve_assert_op;
///
/// let sink = Diagnostics::new();
/// sink.set_assert_hook(|_, _, _| {});
/// let depth = 3;
/// salve_assert_op!(sink, depth, <=, 128);
/// salve_assert_op!(sink, depth, >, 0, "depth must be positive");
/// ```
#[macro_export]
macro_rules! salve_assert_op {
    ($sink:expr, $a:expr, $op:tt, $b:expr $(,)?) => {
        $crate::salve_assert_op!($sink, $a, $op, $b, "")
    };
    ($sink:expr, $a:expr, $op:tt, $b:expr, $desc:expr $(,)?) => {
        if cfg!(debug_assertions) {
            match (&$a, &$b) {
                (left, right) => {
                    if !(*left $op *right) {
                        let message = format!(
                            "Assertion failed at {}:{}\n\t{} {} {}\n\t{:?} {} {:?}\n\t(false)\n\t{}",
                            file!(),
                            line!(),
                            stringify!($a),
                            stringify!($op),
                            stringify!($b),
                            left,
                            stringify!($op),
                            right,
                            $desc
                        );
                        ($sink).assertion_failed(&message, file!(), line!());
                    }
                }
            }
        }
    };
}
