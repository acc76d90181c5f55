//! Captured and resolved stack types.

use std::fmt;

use smallvec::SmallVec;

use super::symbols::Symbol;
use super::Address;

/// Frames kept inline before a capture spills to the heap.
pub const INLINE_FRAMES: usize = 32;

/// Default capacity of a capture.
pub const DEFAULT_CAPACITY: usize = 128;

/// Placeholder shown for a frame that could not be resolved.
pub const SENTINEL: &str = "????";

/// Raw call chain, innermost call first.
///
/// The logical length never exceeds the capacity chosen at capture time.
/// A stack is only ever replaced as a whole, by [`CapturedStack::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedStack
{
    pub(crate) frames: SmallVec<[Address; INLINE_FRAMES]>,
    pub(crate) capacity: usize,
}

impl CapturedStack
{
    /// An empty stack that can hold up to `capacity` frames.
    pub fn with_capacity(capacity: usize) -> Self
    {
        Self {
            frames: SmallVec::new(),
            capacity,
        }
    }

    /// Build a stack from known addresses, truncated to `capacity`.
    pub fn from_addresses(addresses: impl IntoIterator<Item = Address>, capacity: usize) -> Self
    {
        Self {
            frames: addresses.into_iter().take(capacity).collect(),
            capacity,
        }
    }

    pub fn frames(&self) -> &[Address]
    {
        &self.frames
    }

    pub fn len(&self) -> usize
    {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize
    {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = Address> + '_
    {
        self.frames.iter().copied()
    }
}

impl Default for CapturedStack
{
    fn default() -> Self
    {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

/// One captured frame after symbolication.
///
/// Recomputed on every resolve and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFrame
{
    /// Address the frame was captured at.
    pub address: Address,
    /// Symbol information, `None` when nothing could be found.
    pub symbol: Option<Symbol>,
}

impl ResolvedFrame
{
    /// A frame with no symbol information.
    pub fn unresolved(address: Address) -> Self
    {
        Self { address, symbol: None }
    }

    pub fn is_resolved(&self) -> bool
    {
        self.symbol.is_some()
    }
}

impl fmt::Display for ResolvedFrame
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match &self.symbol {
            Some(symbol) => write!(f, "{symbol}"),
            None => f.write_str(SENTINEL),
        }
    }
}
