//! # Stack Unwinding
//!
//! Captures the chain of active calls of the current thread as raw
//! program-counter addresses.
//!
//! The platform facility sits behind the [`PlatformUnwinder`] trait:
//!
//! 1. **[`NativeFrameWalker`]**: walks the stack with the platform unwinder
//!    (`_Unwind_Backtrace` on Unix, `RtlVirtualUnwind` on Windows) through the
//!    `backtrace` crate.
//! 2. **[`NoUnwinder`]**: for targets without an unwinder. Every capture is
//!    empty, which is a supported degraded mode and not an error.
//!
//! [`default_unwinder`] picks one of them at compile time.
//!
//! ## Hiding the capture machinery
//!
//! The frames between the platform unwinder and the caller (the walker, the
//! capturer, the entry point) are never interesting. Every public entry point
//! is `#[inline(never)]` and passes its own function address as an *anchor*:
//! all frames up to and including the anchor's frame are dropped before `skip`
//! is applied. When the unwinder cannot tell function start addresses, the
//! anchor is never seen and nothing is dropped.

use once_cell::sync::Lazy;
use smallvec::SmallVec;
use tracing::trace;

use crate::config::CaptureConfig;
use crate::types::{Address, CapturedStack, INLINE_FRAMES};

/// Upper bound on frames that may precede the anchor.
const MAX_MACHINERY_FRAMES: usize = 64;

/// One frame as reported by the platform unwinder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame
{
    /// Instruction pointer (a return address for all but the innermost frame).
    pub ip: Address,
    /// Start address of the enclosing function, if the unwinder knows it.
    pub function: Option<Address>,
}

/// Native facility used to walk the active call chain.
///
/// Implementations report frames innermost first and stop as soon as
/// `visit` returns `false`.
pub trait PlatformUnwinder: Send + Sync
{
    /// Short label used in logs and the CLI `info` output.
    fn name(&self) -> &'static str;

    /// Walk the current thread's stack.
    fn walk(&self, visit: &mut dyn FnMut(RawFrame) -> bool);
}

/// Unwinder backed by the platform's native stack walker.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFrameWalker;

impl PlatformUnwinder for NativeFrameWalker
{
    fn name(&self) -> &'static str
    {
        "native-frame-walker"
    }

    fn walk(&self, visit: &mut dyn FnMut(RawFrame) -> bool)
    {
        backtrace::trace(|frame| {
            let function = frame.symbol_address();
            visit(RawFrame {
                ip: Address::from_ptr(frame.ip()),
                function: (!function.is_null()).then(|| Address::from_ptr(function)),
            })
        });
    }
}

/// Unwinder for targets with no stack walking support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUnwinder;

impl PlatformUnwinder for NoUnwinder
{
    fn name(&self) -> &'static str
    {
        "none"
    }

    fn walk(&self, _visit: &mut dyn FnMut(RawFrame) -> bool) {}
}

/// The unwinder this target supports.
#[cfg(not(target_family = "wasm"))]
pub fn default_unwinder() -> Box<dyn PlatformUnwinder>
{
    Box::new(NativeFrameWalker)
}

/// The unwinder this target supports.
#[cfg(target_family = "wasm")]
pub fn default_unwinder() -> Box<dyn PlatformUnwinder>
{
    Box::new(NoUnwinder)
}

static CAPTURER: Lazy<FrameCapturer> = Lazy::new(FrameCapturer::native);

static CAPTURE_CONFIG: Lazy<CaptureConfig> = Lazy::new(CaptureConfig::from_env);

/// Turns a platform walk into a [`CapturedStack`].
pub struct FrameCapturer
{
    unwinder: Box<dyn PlatformUnwinder>,
}

impl FrameCapturer
{
    pub fn new(unwinder: Box<dyn PlatformUnwinder>) -> Self
    {
        Self { unwinder }
    }

    /// Capturer using [`default_unwinder`].
    pub fn native() -> Self
    {
        Self::new(default_unwinder())
    }

    /// Process-wide capturer used by the free functions of this module.
    pub fn global() -> &'static FrameCapturer
    {
        &CAPTURER
    }

    pub fn unwinder_name(&self) -> &'static str
    {
        self.unwinder.name()
    }

    /// Capture the current call chain.
    ///
    /// Frames up to and including `anchor`'s frame are dropped first (see the
    /// module docs), then `skip` more frames, then at most `capacity` frames
    /// are kept.
    pub fn capture_from(&self, anchor: Option<Address>, skip: usize, capacity: usize) -> CapturedStack
    {
        if capacity == 0 {
            return CapturedStack::with_capacity(0);
        }

        let wanted = skip.saturating_add(capacity);
        let mut seen: SmallVec<[Address; INLINE_FRAMES]> = SmallVec::new();
        let mut anchor_at: Option<usize> = None;

        self.unwinder.walk(&mut |frame: RawFrame| {
            if frame.ip.is_zero() {
                return false;
            }

            if anchor_at.is_none() && anchor.is_some() && frame.function == anchor {
                anchor_at = Some(seen.len());
                seen.push(frame.ip);
                return true;
            }

            seen.push(frame.ip);
            let kept = match anchor_at {
                Some(index) => seen.len() - index - 1,
                None => seen.len().saturating_sub(MAX_MACHINERY_FRAMES),
            };
            kept < wanted
        });

        let start = anchor_at.map_or(0, |index| index + 1);
        trace!(
            unwinder = self.unwinder.name(),
            walked = seen.len(),
            hidden = start,
            skip,
            "captured call chain"
        );

        CapturedStack::from_addresses(seen.into_iter().skip(start).skip(skip), capacity)
    }
}

/// Capture the calling thread's stack.
///
/// The first frame is the return address inside the function that called
/// `capture`, unless `skip` drops it. Returns an empty stack when the
/// platform has no unwinder.
///
/// ## Example
///
/// ```rust
/// use salve_core::unwind::capture;
///
/// let stack = capture(0, 16);
/// assert!(stack.len() <= 16);
/// ```
#[inline(never)]
pub fn capture(skip: usize, capacity: usize) -> CapturedStack
{
    let anchor = Address::of_fn(capture as fn(usize, usize) -> CapturedStack as usize);
    FrameCapturer::global().capture_from(Some(anchor), skip, capacity)
}

/// [`capture`] with the configured default capacity (`SALVE_STACK_CAPACITY`).
#[inline(never)]
pub fn capture_default(skip: usize) -> CapturedStack
{
    let anchor = Address::of_fn(capture_default as fn(usize) -> CapturedStack as usize);
    FrameCapturer::global().capture_from(Some(anchor), skip, default_capacity())
}

/// Capacity used when the caller does not choose one.
pub fn default_capacity() -> usize
{
    CAPTURE_CONFIG.capacity
}

impl CapturedStack
{
    /// Replace this stack with the calling thread's current call chain,
    /// keeping the existing capacity.
    #[inline(never)]
    pub fn save(&mut self, skip: usize)
    {
        let anchor = Address::of_fn(CapturedStack::save as fn(&mut CapturedStack, usize) as usize);
        *self = FrameCapturer::global().capture_from(Some(anchor), skip, self.capacity);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    /// Replays a fixed list of frames.
    struct ScriptedUnwinder(Vec<RawFrame>);

    impl PlatformUnwinder for ScriptedUnwinder
    {
        fn name(&self) -> &'static str
        {
            "scripted"
        }

        fn walk(&self, visit: &mut dyn FnMut(RawFrame) -> bool)
        {
            for frame in &self.0 {
                if !visit(*frame) {
                    break;
                }
            }
        }
    }

    fn frame(ip: u64, function: Option<u64>) -> RawFrame
    {
        RawFrame {
            ip: Address::from(ip),
            function: function.map(Address::from),
        }
    }

    fn scripted() -> FrameCapturer
    {
        // two machinery frames, the anchor, then four caller frames
        FrameCapturer::new(Box::new(ScriptedUnwinder(vec![
            frame(0x10, Some(0x1)),
            frame(0x20, Some(0x2)),
            frame(0x30, Some(0xa)),
            frame(0x40, None),
            frame(0x50, None),
            frame(0x60, None),
            frame(0x70, None),
        ])))
    }

    fn values(stack: &CapturedStack) -> Vec<u64>
    {
        stack.iter().map(Address::value).collect()
    }

    #[test]
    fn test_anchor_hides_machinery()
    {
        let stack = scripted().capture_from(Some(Address::from(0xau64)), 0, 16);
        assert_eq!(values(&stack), vec![0x40, 0x50, 0x60, 0x70]);
    }

    #[test]
    fn test_skip_after_anchor()
    {
        let stack = scripted().capture_from(Some(Address::from(0xau64)), 2, 16);
        assert_eq!(values(&stack), vec![0x60, 0x70]);
    }

    #[test]
    fn test_capacity_truncates()
    {
        let stack = scripted().capture_from(Some(Address::from(0xau64)), 1, 2);
        assert_eq!(values(&stack), vec![0x50, 0x60]);
        assert_eq!(stack.capacity(), 2);
    }

    #[test]
    fn test_missing_anchor_keeps_everything()
    {
        let stack = scripted().capture_from(Some(Address::from(0xbeefu64)), 0, 16);
        assert_eq!(stack.len(), 7);
    }

    #[test]
    fn test_skip_past_depth_is_empty()
    {
        let stack = scripted().capture_from(Some(Address::from(0xau64)), 10, 16);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_empty()
    {
        assert!(scripted().capture_from(None, 0, 0).is_empty());
    }

    #[test]
    fn test_walk_stops_at_null_frame()
    {
        let capturer = FrameCapturer::new(Box::new(ScriptedUnwinder(vec![
            frame(0x10, None),
            frame(0, None),
            frame(0x30, None),
        ])));
        assert_eq!(values(&capturer.capture_from(None, 0, 8)), vec![0x10]);
    }

    #[test]
    fn test_no_unwinder_is_empty()
    {
        let capturer = FrameCapturer::new(Box::new(NoUnwinder));
        assert!(capturer.capture_from(None, 0, 32).is_empty());
        assert_eq!(capturer.unwinder_name(), "none");
    }
}
