//! Where warnings and failures end up when no observer handles them.

use std::io::{self, Write};

/// Presents a message to the user.
pub trait Notifier: Send + Sync
{
    /// Informational message.
    fn alert(&self, message: &str, title: &str);

    /// Error message.
    fn errorbox(&self, message: &str, title: &str);
}

/// Writes messages to stderr as `[title] message`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl ConsoleNotifier
{
    fn emit(message: &str, title: &str)
    {
        let mut stderr = io::stderr().lock();
        // nowhere left to report a broken stderr
        let _ = if title.is_empty() {
            writeln!(stderr, "{message}")
        } else {
            writeln!(stderr, "[{title}] {message}")
        };
    }
}

impl Notifier for ConsoleNotifier
{
    fn alert(&self, message: &str, title: &str)
    {
        Self::emit(message, title);
    }

    fn errorbox(&self, message: &str, title: &str)
    {
        Self::emit(message, title);
    }
}
