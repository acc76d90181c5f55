//! Tests for the resolver session with scripted symbol sources

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use salve_core::config::ResolverConfig;
use salve_core::symbols::{Resolver, SymbolAvailability, SymbolSource};
use salve_core::types::{Address, CapturedStack, Symbol, SymbolLanguage, SymbolName};

const PROBE: Address = Address::new(0xdead_0000);

/// Answers every lookup and counts the ones that are not probes.
struct CountingSource
{
    lookups: Arc<AtomicUsize>,
}

impl SymbolSource for CountingSource
{
    fn lookup(&mut self, address: Address) -> Option<Symbol>
    {
        if address != PROBE {
            self.lookups.fetch_add(1, Ordering::SeqCst);
        }
        Some(Symbol::new(SymbolName::new("frame".to_string(), None, SymbolLanguage::C), None))
    }
}

/// Never knows anything.
struct FailingSource
{
    calls: Arc<AtomicUsize>,
}

impl SymbolSource for FailingSource
{
    fn lookup(&mut self, _address: Address) -> Option<Symbol>
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        None
    }
}

fn one_frame() -> CapturedStack
{
    CapturedStack::from_addresses([Address::from(0x4242)], 1)
}

#[test]
fn test_threads_share_one_session()
{
    const THREADS: usize = 8;
    const RESOLVES: usize = 100;

    let lookups = Arc::new(AtomicUsize::new(0));
    let resolver = Arc::new(
        Resolver::new(CountingSource { lookups: lookups.clone() }, ResolverConfig::default()).with_probe(PROBE),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let resolver = resolver.clone();
            std::thread::spawn(move || {
                let stack = one_frame();
                for _ in 0..RESOLVES {
                    assert_eq!(resolver.resolve(&stack).len(), 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(lookups.load(Ordering::SeqCst), THREADS * RESOLVES);
    assert_eq!(resolver.availability(), SymbolAvailability::Available);
}

#[test]
fn test_unavailable_source_is_never_called_again()
{
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = Resolver::new(FailingSource { calls: calls.clone() }, ResolverConfig { max_probes: 4 });
    let stack = CapturedStack::from_addresses([0x10u64, 0x20, 0x30].map(Address::from), 3);

    while resolver.availability() == SymbolAvailability::Unknown {
        let frames = resolver.resolve(&stack);
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|frame| !frame.is_resolved()));
    }
    assert_eq!(resolver.availability(), SymbolAvailability::Unavailable);
    let latched = calls.load(Ordering::SeqCst);
    assert_eq!(latched, 4);

    for _ in 0..10 {
        assert_eq!(resolver.resolve(&stack).len(), 3);
        resolver.resolve_address(Address::from(0x10));
    }
    assert_eq!(calls.load(Ordering::SeqCst), latched);
}
