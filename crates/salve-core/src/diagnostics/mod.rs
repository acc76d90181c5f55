//! # Diagnostics
//!
//! A sink for warnings, failures and assertion reports.
//!
//! Observers are registered per channel and run newest first; dispatch stops
//! at the first observer that returns `true`. Every sink starts with one
//! fallback observer per channel that hands the message to its [`Notifier`]:
//!
//! - warnings go to [`Notifier::alert`] with the title `Warning` (empty
//!   warnings are dropped)
//! - failures go to [`Notifier::errorbox`] with the title `Error`
//!
//! A message raised on a channel while that channel is already dispatching
//! is ignored.
//!
//! ## Example
//!
//! ```rust
//! use salve_core::diagnostics::Diagnostics;
//!
//! let sink = Diagnostics::new();
//! sink.on_warn(|text| text.starts_with("noisy"));
//! sink.warn("noisy: handled by the observer, never printed");
//! ```

use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

pub mod flavor;
pub mod guard;
pub mod notifier;

pub use flavor::{is_asserting, is_debug, is_release};
pub use guard::ReentrancyGuard;
pub use notifier::{ConsoleNotifier, Notifier};

/// Handles a message; returns `true` to stop further observers.
pub type Observer = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Receives `(message, file, line)` for a failed assertion.
pub type AssertHook = Arc<dyn Fn(&str, &str, u32) + Send + Sync>;

pub struct Diagnostics
{
    warns: Mutex<Vec<Observer>>,
    fails: Mutex<Vec<Observer>>,
    assert_hook: Mutex<Option<AssertHook>>,
    notifier: Arc<dyn Notifier>,
    warning: AtomicBool,
    failing: AtomicBool,
}

impl Diagnostics
{
    /// A sink reporting to stderr.
    pub fn new() -> Self
    {
        Self::with_notifier(Arc::new(ConsoleNotifier))
    }

    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self
    {
        Self {
            warns: Mutex::new(vec![warn_fallback(notifier.clone())]),
            fails: Mutex::new(vec![fail_fallback(notifier.clone())]),
            assert_hook: Mutex::new(None),
            notifier,
            warning: AtomicBool::new(false),
            failing: AtomicBool::new(false),
        }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier>
    {
        &self.notifier
    }

    /// Register a warning observer. It runs before every observer registered earlier.
    pub fn on_warn(&self, observer: impl Fn(&str) -> bool + Send + Sync + 'static)
    {
        self.warns.lock().push(Arc::new(observer));
    }

    /// Register a failure observer. It runs before every observer registered earlier.
    pub fn on_fail(&self, observer: impl Fn(&str) -> bool + Send + Sync + 'static)
    {
        self.fails.lock().push(Arc::new(observer));
    }

    /// Drop all warning observers except the fallback.
    pub fn clear_warn(&self)
    {
        self.warns.lock().truncate(1);
    }

    /// Drop all failure observers except the fallback.
    pub fn clear_fail(&self)
    {
        self.fails.lock().truncate(1);
    }

    /// Dispatch a warning. Returns `false` if it was dropped as re-entrant.
    pub fn warn(&self, text: &str) -> bool
    {
        dispatch("warn", &self.warns, &self.warning, text)
    }

    /// Dispatch a failure. Returns `false` if it was dropped as re-entrant.
    pub fn fail(&self, text: &str) -> bool
    {
        dispatch("fail", &self.fails, &self.failing, text)
    }

    /// Route failed assertions to `hook` instead of [`Diagnostics::fail`].
    pub fn set_assert_hook(&self, hook: impl Fn(&str, &str, u32) + Send + Sync + 'static)
    {
        *self.assert_hook.lock() = Some(Arc::new(hook));
    }

    pub fn clear_assert_hook(&self)
    {
        *self.assert_hook.lock() = None;
    }

    /// Report a failed assertion. Called by the assertion macros.
    pub fn assertion_failed(&self, message: &str, file: &str, line: u32)
    {
        let hook = self.assert_hook.lock().clone();
        match hook {
            Some(hook) => hook(message, file, line),
            None => {
                self.fail(message);
            }
        }
    }

    /// Report `reason` as a failure (unless empty) and exit with `code`.
    pub fn die(&self, reason: &str, code: i32) -> !
    {
        if !reason.is_empty() {
            self.fail(reason);
        }
        error!(code, "exiting");
        process::exit(code)
    }
}

impl Default for Diagnostics
{
    fn default() -> Self
    {
        Self::new()
    }
}

fn warn_fallback(notifier: Arc<dyn Notifier>) -> Observer
{
    Arc::new(move |text: &str| {
        if !text.is_empty() {
            notifier.alert(text, "Warning");
        }
        true
    })
}

fn fail_fallback(notifier: Arc<dyn Notifier>) -> Observer
{
    Arc::new(move |text: &str| {
        notifier.errorbox(text, "Error");
        true
    })
}

fn dispatch(channel: &'static str, observers: &Mutex<Vec<Observer>>, busy: &AtomicBool, text: &str) -> bool
{
    let Some(_guard) = ReentrancyGuard::acquire(busy) else {
        debug!(channel, "dropping re-entrant message");
        return false;
    };

    // observers may register more observers, so run them unlocked
    let snapshot: Vec<Observer> = observers.lock().clone();
    for observer in snapshot.iter().rev() {
        if observer(text) {
            break;
        }
    }
    true
}
