//! # Symbol Resolution
//!
//! Turns captured addresses into function names and source positions.
//!
//! ## Components
//!
//! - [`SymbolSource`]: answers "what is at this address?" for one address.
//! - [`ImageSymbols`]: the source for the running process (loader lookup,
//!   then the module's DWARF line tables or symbol table).
//! - [`Resolver`]: the process-wide session that owns a source, serialises
//!   access to it and decides once whether symbol lookup works at all.
//!
//! ## Availability
//!
//! Symbol information may be missing entirely (stripped binaries, sandboxed
//! processes). While availability is unknown, every resolve first looks up a
//! probe address inside this module. The first successful probe marks
//! symbols as available for the rest of the process. After
//! `max_probes` failures they are marked unavailable and the source is never
//! asked again. Until then a failed probe only degrades that one call.
//!
//! Either way a resolve returns exactly one frame per input address; frames
//! without information render as `????`.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

pub mod cache;
pub mod demangle;
pub mod image;
pub mod module;

use gimli::{EndianArcSlice, RunTimeEndian};

pub use cache::ImageSymbols;
pub use demangle::demangle;
pub use image::{BinaryImage, ImageDescriptor, ImageId};
pub use module::{module_for_address, ModuleInfo};

use crate::config::ResolverConfig;
use crate::types::{Address, CapturedStack, ResolvedFrame, Symbol};

type OwnedReader = EndianArcSlice<RunTimeEndian>;

/// Something that can name the code at an address.
pub trait SymbolSource: Send
{
    /// Best-effort lookup. `None` means nothing is known about `address`.
    fn lookup(&mut self, address: Address) -> Option<Symbol>;
}

/// Whether symbol lookup has been found to work in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolAvailability
{
    /// No probe has succeeded yet and the retry budget is not exhausted.
    Unknown,
    Available,
    /// Latched after too many failed probes. Final.
    Unavailable,
}

struct Session<S>
{
    source: S,
    availability: SymbolAvailability,
    failed_probes: u32,
}

impl<S: SymbolSource> Session<S>
{
    fn ensure_available(&mut self, probe: Address, max_probes: u32) -> bool
    {
        match self.availability {
            SymbolAvailability::Available => true,
            SymbolAvailability::Unavailable => false,
            SymbolAvailability::Unknown => {
                if self.source.lookup(probe).is_some() {
                    self.availability = SymbolAvailability::Available;
                    info!(probes = self.failed_probes + 1, "symbol information available");
                    return true;
                }

                self.failed_probes += 1;
                if self.failed_probes >= max_probes.max(1) {
                    self.availability = SymbolAvailability::Unavailable;
                    warn!(probes = self.failed_probes, "symbol information unavailable, frames will not be resolved");
                } else {
                    debug!(failed = self.failed_probes, max_probes, "symbol probe failed");
                }
                false
            }
        }
    }
}

/// Serialised access to a [`SymbolSource`] plus the availability state.
///
/// One resolve holds the session lock for its whole duration, so concurrent
/// resolves never interleave their lookups.
pub struct Resolver<S>
{
    config: ResolverConfig,
    probe: Address,
    session: Mutex<Session<S>>,
}

impl<S: SymbolSource> Resolver<S>
{
    /// A session that probes with the address of [`resolve`].
    pub fn new(source: S, config: ResolverConfig) -> Self
    {
        Self {
            config,
            probe: default_probe(),
            session: Mutex::new(Session {
                source,
                availability: SymbolAvailability::Unknown,
                failed_probes: 0,
            }),
        }
    }

    /// Use a different probe address.
    pub fn with_probe(mut self, probe: Address) -> Self
    {
        self.probe = probe;
        self
    }

    pub fn availability(&self) -> SymbolAvailability
    {
        self.session.lock().availability
    }

    /// Resolve every frame of `stack`, in order.
    pub fn resolve(&self, stack: &CapturedStack) -> Vec<ResolvedFrame>
    {
        self.resolve_frames(stack.frames())
    }

    /// Resolve return addresses.
    ///
    /// Each address is looked up one byte earlier so that a call that is the
    /// last instruction of its function is attributed to that function.
    pub fn resolve_frames(&self, addresses: &[Address]) -> Vec<ResolvedFrame>
    {
        if addresses.is_empty() {
            return Vec::new();
        }

        let mut session = self.session.lock();
        if !session.ensure_available(self.probe, self.config.max_probes) {
            return addresses.iter().copied().map(ResolvedFrame::unresolved).collect();
        }

        addresses
            .iter()
            .map(|&address| ResolvedFrame {
                address,
                symbol: session.source.lookup(address.call_site()),
            })
            .collect()
    }

    /// Resolve a single code address exactly as given.
    pub fn resolve_address(&self, address: Address) -> ResolvedFrame
    {
        let mut session = self.session.lock();
        if !session.ensure_available(self.probe, self.config.max_probes) {
            return ResolvedFrame::unresolved(address);
        }

        ResolvedFrame {
            address,
            symbol: session.source.lookup(address),
        }
    }

    /// Run `f` with exclusive access to the source.
    pub fn with_source<R>(&self, f: impl FnOnce(&mut S) -> R) -> R
    {
        f(&mut self.session.lock().source)
    }
}

static SESSION: Lazy<Resolver<ImageSymbols>> =
    Lazy::new(|| Resolver::new(ImageSymbols::new(), ResolverConfig::from_env()));

fn default_probe() -> Address
{
    Address::of_fn(resolve as fn(&CapturedStack) -> Vec<ResolvedFrame> as usize)
}

/// The process-wide resolver session.
pub fn global() -> &'static Resolver<ImageSymbols>
{
    &SESSION
}

/// Resolve a captured stack with the process-wide session.
///
/// Always returns `stack.len()` frames.
///
/// ## Example
///
/// ```rust
/// use salve_core::symbols::resolve;
/// use salve_core::unwind::capture;
///
/// let stack = capture(0, 8);
/// assert_eq!(resolve(&stack).len(), stack.len());
/// ```
#[inline(never)]
pub fn resolve(stack: &CapturedStack) -> Vec<ResolvedFrame>
{
    SESSION.resolve(stack)
}

/// Resolve one code address with the process-wide session.
pub fn resolve_address(address: Address) -> ResolvedFrame
{
    SESSION.resolve_address(address)
}

/// Current availability state of the process-wide session.
pub fn symbol_availability() -> SymbolAvailability
{
    SESSION.availability()
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::{SymbolLanguage, SymbolName};

    /// Names every address `fn_<hex>` and counts lookups.
    #[derive(Default)]
    struct CountingSource
    {
        lookups: usize,
    }

    impl SymbolSource for CountingSource
    {
        fn lookup(&mut self, address: Address) -> Option<Symbol>
        {
            self.lookups += 1;
            let name = SymbolName::new(format!("fn_{:x}", address.value()), None, SymbolLanguage::C);
            Some(Symbol::new(name, None))
        }
    }

    /// Knows nothing, counts lookups.
    #[derive(Default)]
    struct EmptySource
    {
        lookups: usize,
    }

    impl SymbolSource for EmptySource
    {
        fn lookup(&mut self, _address: Address) -> Option<Symbol>
        {
            self.lookups += 1;
            None
        }
    }

    fn stack(values: &[u64]) -> CapturedStack
    {
        CapturedStack::from_addresses(values.iter().copied().map(Address::from), 16)
    }

    fn config(max_probes: u32) -> ResolverConfig
    {
        ResolverConfig { max_probes }
    }

    #[test]
    fn test_resolves_return_addresses_at_call_site()
    {
        let resolver = Resolver::new(CountingSource::default(), config(8));
        let frames = resolver.resolve(&stack(&[0x101, 0x201]));

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].address, Address::from(0x101u64));
        assert_eq!(frames[0].to_string(), "fn_100");
        assert_eq!(frames[1].to_string(), "fn_200");
        assert_eq!(resolver.availability(), SymbolAvailability::Available);
    }

    #[test]
    fn test_resolve_address_is_exact()
    {
        let resolver = Resolver::new(CountingSource::default(), config(8));
        assert_eq!(resolver.resolve_address(Address::from(0x101u64)).to_string(), "fn_101");
    }

    #[test]
    fn test_empty_stack_does_not_probe()
    {
        let resolver = Resolver::new(EmptySource::default(), config(1));
        assert!(resolver.resolve(&stack(&[])).is_empty());
        assert_eq!(resolver.availability(), SymbolAvailability::Unknown);
        assert_eq!(resolver.with_source(|source| source.lookups), 0);
    }

    #[test]
    fn test_probe_runs_once_when_available()
    {
        let resolver = Resolver::new(CountingSource::default(), config(8));
        resolver.resolve(&stack(&[0x10, 0x20, 0x30]));
        resolver.resolve(&stack(&[0x10, 0x20, 0x30]));
        // one probe plus three lookups per resolve
        assert_eq!(resolver.with_source(|source| source.lookups), 7);
    }

    #[test]
    fn test_failed_probes_latch_unavailable()
    {
        let resolver = Resolver::new(EmptySource::default(), config(3));
        let input = stack(&[0x10, 0x20]);

        for round in 1..=3u32 {
            let frames = resolver.resolve(&input);
            assert_eq!(frames.len(), 2);
            assert!(frames.iter().all(|frame| frame.to_string() == "????"));
            assert_eq!(resolver.with_source(|source| source.lookups), round as usize);
        }
        assert_eq!(resolver.availability(), SymbolAvailability::Unavailable);

        for _ in 0..5 {
            assert_eq!(resolver.resolve(&input).len(), 2);
        }
        assert_eq!(resolver.with_source(|source| source.lookups), 3);
    }

    #[test]
    fn test_zero_max_probes_still_probes_once()
    {
        let resolver = Resolver::new(EmptySource::default(), config(0));
        resolver.resolve(&stack(&[0x10]));
        assert_eq!(resolver.availability(), SymbolAvailability::Unavailable);
        assert_eq!(resolver.with_source(|source| source.lookups), 1);
    }

    #[test]
    fn test_concurrent_resolves_do_not_interleave()
    {
        let resolver = std::sync::Arc::new(Resolver::new(CountingSource::default(), config(8)));
        let input = stack(&[0x10, 0x20, 0x30, 0x40]);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let resolver = resolver.clone();
                let input = input.clone();
                scope.spawn(move || {
                    for _ in 0..50 {
                        let frames = resolver.resolve(&input);
                        assert_eq!(frames.len(), 4);
                        assert!(frames.iter().all(ResolvedFrame::is_resolved));
                    }
                });
            }
        });

        // a single probe, then 8 threads x 50 resolves x 4 frames
        assert_eq!(resolver.with_source(|source| source.lookups), 1 + 8 * 50 * 4);
    }

    #[test]
    fn test_custom_probe_address_is_used()
    {
        struct OnlyProbe;

        impl SymbolSource for OnlyProbe
        {
            fn lookup(&mut self, address: Address) -> Option<Symbol>
            {
                (address == Address::from(0xabcu64))
                    .then(|| Symbol::new(SymbolName::new("probe".into(), None, SymbolLanguage::C), None))
            }
        }

        let resolver = Resolver::new(OnlyProbe, config(1)).with_probe(Address::from(0xabcu64));
        let frames = resolver.resolve(&stack(&[0x10]));
        assert_eq!(resolver.availability(), SymbolAvailability::Available);
        assert!(!frames[0].is_resolved());
    }
}
