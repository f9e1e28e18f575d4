use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use bus_manager::{BusError, BusFactory, BusHandle, BusTable};

// ---------------------------------------------------------------------------
// Mock factory
// ---------------------------------------------------------------------------

/// A simple mock bus for testing.
#[derive(Debug, PartialEq, Eq)]
struct MockBus {
    number: u32,
}

/// Counters for tracking factory calls.
#[derive(Clone, Default)]
struct MockCounters {
    open_count: Arc<AtomicUsize>,
    close_count: Arc<AtomicUsize>,
}

impl MockCounters {
    fn opens(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[derive(Debug, PartialEq)]
struct MockError(&'static str);

/// The factory type for tests.
struct MockFactory {
    counters: MockCounters,
    /// If set to true, the next `open` call will fail.
    fail_next_open: AtomicBool,
    /// If set to true, the next `close` call will fail.
    fail_next_close: AtomicBool,
    /// Simulated latency of the native open.
    open_delay: Duration,
    /// Only this key is slow to open, if set.
    slow_key: Option<u32>,
}

impl BusFactory for MockFactory {
    type Key = u32;
    type Bus = MockBus;
    type Error = MockError;

    fn open(&self, key: &u32) -> Result<MockBus, MockError> {
        self.counters.open_count.fetch_add(1, Ordering::SeqCst);
        if !self.open_delay.is_zero() && self.slow_key.map_or(true, |k| k == *key) {
            thread::sleep(self.open_delay);
        }
        if self.fail_next_open.swap(false, Ordering::SeqCst) {
            return Err(MockError("open failed"));
        }
        Ok(MockBus { number: *key })
    }

    fn close(&self, _key: &u32, _bus: MockBus) -> Result<(), MockError> {
        self.counters.close_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_close.swap(false, Ordering::SeqCst) {
            return Err(MockError("close failed"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

fn make_table(open_delay: Duration) -> (BusTable<MockFactory>, MockCounters) {
    make_table_with(open_delay, None)
}

fn make_table_with(
    open_delay: Duration,
    slow_key: Option<u32>,
) -> (BusTable<MockFactory>, MockCounters) {
    let counters = MockCounters::default();
    let factory = MockFactory {
        counters: counters.clone(),
        fail_next_open: AtomicBool::new(false),
        fail_next_close: AtomicBool::new(false),
        open_delay,
        slow_key,
    };
    (BusTable::new(factory), counters)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn acquire_opens_bus() {
    let (table, counters) = make_table(Duration::ZERO);

    let handle = table.acquire(1).unwrap();
    assert_eq!(handle.number, 1);
    assert_eq!(table.user_count(&1), 1);
    assert_eq!(table.is_active(&1), Some(true));
    assert_eq!(counters.opens(), 1);
}

#[test]
fn acquire_reuses_active_bus() {
    let (table, counters) = make_table(Duration::ZERO);

    let h1 = table.acquire(1).unwrap();
    let h2 = table.acquire(1).unwrap();

    assert_eq!(table.user_count(&1), 2);
    assert_eq!(h2.user_count(), 2);
    assert_eq!(counters.opens(), 1);
    assert_eq!(h1.number, h2.number);
}

#[test]
fn drop_decrements_users() {
    let (table, counters) = make_table(Duration::ZERO);

    let h1 = table.acquire(1).unwrap();
    let h2 = table.acquire(1).unwrap();
    drop(h1);
    assert_eq!(table.user_count(&1), 1);
    assert_eq!(counters.closes(), 0);

    drop(h2);
    assert_eq!(table.user_count(&1), 0);
    assert_eq!(counters.closes(), 1);
}

#[test]
fn last_release_closes_and_forgets_key() {
    let (table, counters) = make_table(Duration::ZERO);

    let handle = table.acquire(3).unwrap();
    assert_eq!(table.len(), 1);

    handle.release().unwrap();
    assert_eq!(counters.closes(), 1);
    assert_eq!(table.is_active(&3), Some(false));
    assert!(table.is_empty());
}

#[test]
fn acquire_after_release_reopens() {
    let (table, counters) = make_table(Duration::ZERO);

    // First cycle
    let handle = table.acquire(1).unwrap();
    handle.release().unwrap();

    // Second cycle
    let handle = table.acquire(1).unwrap();
    assert_eq!(handle.number, 1);
    drop(handle);

    assert_eq!(counters.opens(), 2);
    assert_eq!(counters.closes(), 2);
}

#[test]
fn open_error_leaves_no_slot() {
    let (table, counters) = make_table(Duration::ZERO);
    table.factory().fail_next_open.store(true, Ordering::SeqCst);

    // First attempt should fail
    let result = table.acquire(1);
    assert!(matches!(result, Err(BusError::FactoryError(_))));
    assert!(table.is_empty());
    assert_eq!(table.user_count(&1), 0);

    // Retry should succeed (fail flag was reset by the factory)
    let handle = table.acquire(1).unwrap();
    assert_eq!(handle.number, 1);
    assert_eq!(counters.opens(), 2);
}

#[test]
fn close_error_is_reported_once() {
    let (table, counters) = make_table(Duration::ZERO);
    table.factory().fail_next_close.store(true, Ordering::SeqCst);

    let h1 = table.acquire(1).unwrap();
    let h2 = table.acquire(1).unwrap();

    assert_eq!(h1.release(), Ok(()));
    assert_eq!(
        h2.release(),
        Err(BusError::FactoryError(MockError("close failed")))
    );
    assert_eq!(counters.closes(), 1);
    assert!(table.is_empty());
}

#[test]
fn keys_are_independent() {
    let (table, counters) = make_table(Duration::ZERO);

    let a = table.acquire(1).unwrap();
    let b = table.acquire(2).unwrap();
    assert_eq!(counters.opens(), 2);
    assert_eq!(table.len(), 2);

    drop(a);
    assert_eq!(table.is_active(&1), Some(false));
    assert_eq!(table.is_active(&2), Some(true));
    assert_eq!(b.number, 2);
}

#[test]
fn slow_open_does_not_block_other_keys() {
    let (table, counters) = make_table_with(Duration::from_millis(500), Some(1));
    let slow_done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            let handle = table.acquire(1).unwrap();
            slow_done.store(true, Ordering::SeqCst);
            handle.release().unwrap();
        });

        // Wait until the open of key 1 is in flight.
        while counters.opens() == 0 {
            thread::yield_now();
        }

        let start = Instant::now();
        let fast = table.acquire(2).unwrap();
        assert!(start.elapsed() < Duration::from_millis(250));
        assert!(!slow_done.load(Ordering::SeqCst));
        assert_eq!(fast.number, 2);
        fast.release().unwrap();
    });

    assert!(slow_done.load(Ordering::SeqCst));
    assert_eq!(counters.opens(), 2);
    assert_eq!(counters.closes(), 2);
    assert!(table.is_empty());
}

#[test]
fn multiple_cycles() {
    let (table, counters) = make_table(Duration::ZERO);

    for _ in 0..3 {
        let handle = table.acquire(7).unwrap();
        assert_eq!(handle.number, 7);
        handle.release().unwrap();
    }

    assert_eq!(counters.opens(), 3);
    assert_eq!(counters.closes(), 3);
}

#[test]
fn concurrent_acquire_opens_once() {
    const THREADS: usize = 8;
    let (table, counters) = make_table(Duration::from_millis(20));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<BusHandle<MockFactory>> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let table = table.clone();
                let barrier = barrier.clone();
                s.spawn(move || {
                    barrier.wait();
                    table.acquire(1).unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(counters.opens(), 1);
    assert_eq!(table.user_count(&1), THREADS);

    let barrier = Arc::new(Barrier::new(THREADS));
    thread::scope(|s| {
        for handle in handles {
            let barrier = barrier.clone();
            s.spawn(move || {
                barrier.wait();
                handle.release().unwrap();
            });
        }
    });

    assert_eq!(counters.closes(), 1);
    assert!(table.is_empty());

    // A fresh acquire after the last close opens the bus again.
    let _handle = table.acquire(1).unwrap();
    assert_eq!(counters.opens(), 2);
}

#[test]
fn release_and_reacquire_churn_stays_balanced() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 2000;
    let (table, counters) = make_table(Duration::ZERO);
    let barrier = Barrier::new(THREADS);

    // Last releases and fresh acquires of one key interleave, so acquirers
    // regularly land on a slot that is being retired.
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                barrier.wait();
                for _ in 0..ROUNDS {
                    let handle = table.acquire(3).unwrap();
                    assert_eq!(handle.number, 3);
                    handle.release().unwrap();
                }
            });
        }
    });

    assert!(counters.opens() >= 1);
    assert_eq!(counters.opens(), counters.closes());
    assert!(table.is_empty());
    assert_eq!(table.user_count(&3), 0);
}

#[test]
fn bus_error_formats_and_is_an_error() {
    let err: BusError<MockError> = BusError::FactoryError(MockError("boom"));
    assert_eq!(err.to_string(), r#"bus factory error: MockError("boom")"#);
    assert_eq!(BusError::<MockError>::Poisoned.to_string(), "bus slot is poisoned");

    let dyn_err: &dyn std::error::Error = &err;
    assert!(dyn_err.source().is_none());
}

#[test]
fn handle_deref_returns_correct_value() {
    let (table, _) = make_table(Duration::ZERO);

    let handle: BusHandle<MockFactory> = table.acquire(99).unwrap();

    // Access through Deref
    let bus: &MockBus = &handle;
    assert_eq!(bus.number, 99);
    assert_eq!(*handle.key(), 99);
}
