//! Re-entrancy protection for dispatch channels.

use std::sync::atomic::{AtomicBool, Ordering};

/// Marks a channel as busy for as long as the guard lives.
///
/// Acquiring fails while another guard for the same flag is alive, so an
/// observer that raises a message on the channel it is being called from
/// cannot recurse.
#[derive(Debug)]
pub struct ReentrancyGuard<'a>
{
    flag: &'a AtomicBool,
}

impl<'a> ReentrancyGuard<'a>
{
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self>
    {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ReentrancyGuard<'_>
{
    fn drop(&mut self)
    {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_drop()
    {
        let flag = AtomicBool::new(false);
        let guard = ReentrancyGuard::acquire(&flag).expect("first acquire");
        assert!(ReentrancyGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(ReentrancyGuard::acquire(&flag).is_some());
    }
}
