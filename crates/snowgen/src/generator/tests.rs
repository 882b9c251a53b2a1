use crate::{
    AtomicIdGenerator, EPOCH, Error, IdGenerator, NodeId, Poll, SnowflakeGenerator, SnowflakeId,
    SystemClock, TimeSource,
};
use core::cell::Cell;
use std::collections::HashSet;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
    mpsc,
};
use std::thread::scope;

const EPOCH_MS: u64 = EPOCH.as_millis() as u64;

struct MockTime {
    millis: u64,
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// A clock the test can move in both directions.
#[derive(Clone)]
struct SharedMockTime {
    millis: Arc<AtomicU64>,
}

impl SharedMockTime {
    fn new(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for SharedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Frozen at `frozen` for the first `frozen_reads` reads, one millisecond
/// later afterwards.
struct RolloverTime {
    frozen: u64,
    frozen_reads: u64,
    reads: Cell<u64>,
}

impl TimeSource for RolloverTime {
    fn current_millis(&self) -> u64 {
        let reads = self.reads.get() + 1;
        self.reads.set(reads);
        if reads <= self.frozen_reads {
            self.frozen
        } else {
            self.frozen + 1
        }
    }
}

trait PollExt {
    fn unwrap_ready(self) -> SnowflakeId;
    fn unwrap_pending(self) -> u64;
}

impl PollExt for Poll {
    fn unwrap_ready(self) -> SnowflakeId {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_for } => {
                panic!("unexpected pending (yield for: {yield_for})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_for } => yield_for,
        }
    }
}

fn node(id: u16) -> NodeId {
    NodeId::new(id).unwrap()
}

fn run_two_calls_in_same_millisecond<G>()
where
    G: SnowflakeGenerator<MockTime>,
{
    let generator = G::from_node(
        node(1),
        EPOCH,
        MockTime {
            millis: EPOCH_MS + 42,
        },
    );

    let first = generator.next_id().unwrap();
    let second = generator.next_id().unwrap();

    assert_eq!(first.timestamp(), 42);
    assert_eq!(second.timestamp(), 42);
    assert_eq!(first.sequence(), 0);
    assert_eq!(second.sequence(), first.sequence() + 1);
    assert_eq!(first.node_id(), 1);
    assert_eq!(second.node_id(), 1);
    assert!(second > first);
    assert_eq!(
        first.to_raw(),
        (42 << 22) | (1 << 12),
        "packing must match (delta << 22) | (node << 12) | sequence"
    );
}

fn run_sequence_rollover<G>()
where
    G: SnowflakeGenerator<RolloverTime>,
{
    let frozen = EPOCH_MS + 1_000;
    let generator = G::from_node(
        node(5),
        EPOCH,
        RolloverTime {
            frozen,
            frozen_reads: 4097,
            reads: Cell::new(0),
        },
    );

    let mut last = None;
    for expected_sequence in 0..=SnowflakeId::max_sequence() {
        let id = generator.next_id().unwrap();
        assert_eq!(id.timestamp(), 1_000);
        assert_eq!(id.sequence(), expected_sequence);
        assert!(last.is_none_or(|prev| prev < id));
        last = Some(id);
    }

    // Call #4097 still reads the frozen millisecond, finds it exhausted and
    // must move on to the next one.
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 1_001);
    assert_eq!(id.sequence(), 0);
    assert_eq!(id.node_id(), 5);
    assert!(last.unwrap() < id);
}

fn run_pending_when_exhausted<G>()
where
    G: SnowflakeGenerator<SharedMockTime>,
{
    let time = SharedMockTime::new(EPOCH_MS + 7);
    let generator = G::from_node(node(0), EPOCH, time.clone());

    for _ in 0..=SnowflakeId::max_sequence() {
        generator.poll_id().unwrap().unwrap_ready();
    }

    assert_eq!(generator.poll_id().unwrap().unwrap_pending(), 1);
    assert_eq!(generator.poll_id().unwrap().unwrap_pending(), 1);

    time.set(EPOCH_MS + 8);
    let id = generator.poll_id().unwrap().unwrap_ready();
    assert_eq!(id.timestamp(), 8);
    assert_eq!(id.sequence(), 0);
}

fn run_clock_regression<G>()
where
    G: SnowflakeGenerator<SharedMockTime>,
{
    let time = SharedMockTime::new(EPOCH_MS + 100);
    let generator = G::from_node(node(3), EPOCH, time.clone());

    let first = generator.next_id().unwrap();
    assert_eq!(first.sequence(), 0);

    time.set(EPOCH_MS + 99);
    assert_eq!(
        generator.next_id().unwrap_err(),
        Error::ClockMovedBackward {
            now: EPOCH_MS + 99,
            last: EPOCH_MS + 100,
        }
    );
    assert_eq!(
        generator.poll_id().unwrap_err(),
        Error::ClockMovedBackward {
            now: EPOCH_MS + 99,
            last: EPOCH_MS + 100,
        }
    );

    // Restored clock: as if the failed calls never happened.
    time.set(EPOCH_MS + 100);
    let second = generator.next_id().unwrap();
    assert_eq!(second.timestamp(), 100);
    assert_eq!(second.sequence(), 1);
    assert!(second > first);
}

fn run_timestamp_out_of_range<G>()
where
    G: SnowflakeGenerator<SharedMockTime>,
{
    let time = SharedMockTime::new(EPOCH_MS - 1);
    let generator = G::from_node(node(3), EPOCH, time.clone());

    assert_eq!(
        generator.next_id().unwrap_err(),
        Error::TimestampOutOfRange {
            millis: EPOCH_MS - 1,
            epoch: EPOCH_MS,
        }
    );

    // Nothing was committed, so the first valid reading starts at sequence 0.
    time.set(EPOCH_MS);
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 0);
    assert_eq!(id.sequence(), 0);

    time.set(EPOCH_MS + SnowflakeId::max_timestamp() + 1);
    assert!(matches!(
        generator.next_id(),
        Err(Error::TimestampOutOfRange { .. })
    ));
}

fn run_monotonic<G>()
where
    G: SnowflakeGenerator<SystemClock>,
{
    const TOTAL_IDS: usize = 4096 * 64;

    let generator = G::from_node(node(1), EPOCH, SystemClock);
    let mut last = generator.next_id().unwrap();

    for _ in 0..TOTAL_IDS {
        let id = generator.next_id().unwrap();
        assert!(id > last, "{id:?} must be greater than {last:?}");
        assert_eq!(id.node_id(), 1);
        assert!(id.sequence() <= SnowflakeId::max_sequence());
        if id.timestamp() > last.timestamp() {
            assert_eq!(id.sequence(), 0);
        } else {
            assert_eq!(id.sequence(), last.sequence() + 1);
        }
        last = id;
    }
}

fn run_unique_threaded<G>()
where
    G: SnowflakeGenerator<SystemClock> + Sync,
{
    const THREADS: usize = 10;
    const IDS_PER_THREAD: usize = 100_000;
    const TOTAL_IDS: usize = THREADS * IDS_PER_THREAD;

    let generator = G::from_node(node(9), EPOCH, SystemClock);

    let per_thread: Vec<Vec<SnowflakeId>> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    let mut ids = Vec::with_capacity(IDS_PER_THREAD);
                    for _ in 0..IDS_PER_THREAD {
                        ids.push(generator.next_id().unwrap());
                    }
                    ids
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut seen = HashSet::with_capacity(TOTAL_IDS);
    for ids in &per_thread {
        // Each thread observes its own calls in completion order.
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in ids {
            assert_eq!(id.node_id(), 9);
            assert!(id.sequence() <= SnowflakeId::max_sequence());
            assert!(seen.insert(*id), "duplicate id {id:?}");
        }
    }
    assert_eq!(seen.len(), TOTAL_IDS, "Expected {TOTAL_IDS} unique IDs");
}

fn run_large_epoch<G>()
where
    G: SnowflakeGenerator<MockTime>,
{
    let epoch = 1u64 << 52;
    let generator = G::from_node(
        node(1),
        core::time::Duration::from_millis(epoch),
        MockTime { millis: epoch + 5 },
    );

    let first = generator.next_id().unwrap();
    let second = generator.next_id().unwrap();
    assert_eq!(first.timestamp(), 5);
    assert_eq!(first.sequence(), 0);
    assert_eq!(second.timestamp(), 5);
    assert_eq!(second.sequence(), 1);
    assert!(second > first);
}

/// Calls on different threads, each starting only after the previous one
/// returned, still observe increasing IDs.
fn run_ordered_across_threads<G>()
where
    G: SnowflakeGenerator<SystemClock> + Sync,
{
    const THREADS: usize = 8;
    const ROUNDS: usize = 1_000;

    let generator = G::from_node(node(4), EPOCH, SystemClock);

    scope(|s| {
        let (first_tx, mut rx) = mpsc::channel::<Option<SnowflakeId>>();
        for _ in 0..THREADS {
            let (tx, next_rx) = mpsc::channel();
            let prev_rx = core::mem::replace(&mut rx, next_rx);
            let generator = &generator;
            s.spawn(move || {
                while let Ok(prev) = prev_rx.recv() {
                    let id = generator.next_id().unwrap();
                    if let Some(prev) = prev {
                        assert!(id > prev, "{id:?} must be greater than {prev:?}");
                    }
                    if tx.send(Some(id)).is_err() {
                        break;
                    }
                }
            });
        }

        // The last thread hands back to the first.
        first_tx.send(None).unwrap();
        for _ in 0..ROUNDS {
            let id = rx.recv().unwrap();
            first_tx.send(id).unwrap();
        }
        drop(first_tx);
        while rx.recv().is_ok() {}
    });
}

#[test]
fn lock_generator_same_millisecond() {
    run_two_calls_in_same_millisecond::<IdGenerator<_>>();
}

#[test]
fn atomic_generator_same_millisecond() {
    run_two_calls_in_same_millisecond::<AtomicIdGenerator<_>>();
}

#[test]
fn lock_generator_rollover() {
    run_sequence_rollover::<IdGenerator<_>>();
}

#[test]
fn atomic_generator_rollover() {
    run_sequence_rollover::<AtomicIdGenerator<_>>();
}

#[test]
fn lock_generator_pending() {
    run_pending_when_exhausted::<IdGenerator<_>>();
}

#[test]
fn atomic_generator_pending() {
    run_pending_when_exhausted::<AtomicIdGenerator<_>>();
}

#[test]
fn lock_generator_clock_regression() {
    run_clock_regression::<IdGenerator<_>>();
}

#[test]
fn atomic_generator_clock_regression() {
    run_clock_regression::<AtomicIdGenerator<_>>();
}

#[test]
fn lock_generator_out_of_range() {
    run_timestamp_out_of_range::<IdGenerator<_>>();
}

#[test]
fn atomic_generator_out_of_range() {
    run_timestamp_out_of_range::<AtomicIdGenerator<_>>();
}

#[test]
fn lock_generator_monotonic() {
    run_monotonic::<IdGenerator<_>>();
}

#[test]
fn atomic_generator_monotonic() {
    run_monotonic::<AtomicIdGenerator<_>>();
}

#[test]
fn lock_generator_threaded_unique() {
    run_unique_threaded::<IdGenerator<_>>();
}

#[test]
fn atomic_generator_threaded_unique() {
    run_unique_threaded::<AtomicIdGenerator<_>>();
}

#[test]
fn lock_generator_large_epoch() {
    run_large_epoch::<IdGenerator<_>>();
}

#[test]
fn atomic_generator_large_epoch() {
    run_large_epoch::<AtomicIdGenerator<_>>();
}

#[test]
fn lock_generator_ordered_across_threads() {
    run_ordered_across_threads::<IdGenerator<_>>();
}

#[test]
fn atomic_generator_ordered_across_threads() {
    run_ordered_across_threads::<AtomicIdGenerator<_>>();
}

#[test]
fn atomic_with_epoch_past_2_pow_52_stays_unique() {
    let epoch = 1u64 << 52;
    let generator = AtomicIdGenerator::with_epoch(
        1,
        core::time::Duration::from_millis(epoch),
        MockTime { millis: epoch + 5 },
    )
    .unwrap();

    let first = generator.next_id().unwrap();
    let second = generator.next_id().unwrap();
    assert_ne!(first, second);
    assert_eq!(generator.snapshot().last_timestamp, Some(epoch + 5));
    assert_eq!(generator.snapshot().sequence, 1);
}

#[test]
fn regression_leaves_state_unchanged() {
    let time = SharedMockTime::new(EPOCH_MS + 50);
    let lock = IdGenerator::with_clock(0, time.clone()).unwrap();
    let atomic = AtomicIdGenerator::with_clock(0, time.clone()).unwrap();

    lock.next_id().unwrap();
    atomic.next_id().unwrap();
    let lock_before = lock.snapshot();
    let atomic_before = atomic.snapshot();

    time.set(EPOCH_MS + 10);
    assert!(lock.next_id().is_err());
    assert!(atomic.next_id().is_err());

    assert_eq!(lock.snapshot(), lock_before);
    assert_eq!(atomic.snapshot(), atomic_before);
    assert_eq!(lock_before.last_timestamp, Some(EPOCH_MS + 50));
    assert_eq!(lock_before.sequence, 0);
}

#[test]
fn fresh_generator_has_no_last_timestamp() {
    let generator = IdGenerator::with_clock(0, MockTime { millis: EPOCH_MS }).unwrap();
    let state = generator.snapshot();
    assert_eq!(state.last_timestamp, None);
    assert_eq!(state.sequence, 0);
}

#[test]
fn constructors_validate_node_id() {
    assert!(matches!(
        IdGenerator::new(-1),
        Err(Error::InvalidConfiguration { node_id: -1, .. })
    ));
    assert!(matches!(
        IdGenerator::new(1024),
        Err(Error::InvalidConfiguration { node_id: 1024, .. })
    ));
    assert_eq!(IdGenerator::new(0).unwrap().node_id().get(), 0);
    assert_eq!(IdGenerator::new(1023).unwrap().node_id().get(), 1023);

    assert!(AtomicIdGenerator::new(-1).is_err());
    assert!(AtomicIdGenerator::new(1024).is_err());
    assert!(AtomicIdGenerator::new(0).is_ok());
    assert!(AtomicIdGenerator::new(1023).is_ok());
}

#[test]
fn round_trip_recovers_node_id() {
    for node_id in [0_u16, 1, 512, 1023] {
        let generator = IdGenerator::new(node_id).unwrap();
        for _ in 0..10_000 {
            let id = generator.next_id().unwrap();
            assert_eq!(id.node_id(), u64::from(node_id));
            assert!(id.sequence() <= 4095);
            assert!(id.is_valid());
            assert!(id.to_i64() >= 0);
        }
    }
}

#[test]
fn real_clock_back_to_back() {
    let generator = IdGenerator::new(1).unwrap();
    let first = generator.next_id().unwrap();
    let second = generator.next_id().unwrap();

    assert!(second > first);
    if second.timestamp() == first.timestamp() {
        assert_eq!(second.sequence(), first.sequence() + 1);
    } else {
        assert_eq!(second.sequence(), 0);
    }
}

#[test]
fn custom_epoch_shifts_timestamp() {
    let epoch = core::time::Duration::from_millis(1_000);
    let generator = IdGenerator::with_epoch(2, epoch, MockTime { millis: 1_250 }).unwrap();
    let id = generator.next_id().unwrap();
    assert_eq!(generator.epoch(), epoch);
    assert_eq!(id.timestamp(), 250);
    assert_eq!(id.unix_millis(epoch), 1_250);
}

#[cfg(not(feature = "parking-lot"))]
#[test]
fn panicking_clock_poisons_lock() {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::AtomicBool;

    struct PanickyTime {
        armed: AtomicBool,
    }

    impl TimeSource for PanickyTime {
        fn current_millis(&self) -> u64 {
            if self.armed.swap(false, Ordering::SeqCst) {
                panic!("clock failure");
            }
            EPOCH_MS
        }
    }

    let generator = IdGenerator::with_clock(
        0,
        PanickyTime {
            armed: AtomicBool::new(true),
        },
    )
    .unwrap();

    let result = catch_unwind(AssertUnwindSafe(|| generator.next_id()));
    assert!(result.is_err());
    assert_eq!(generator.next_id().unwrap_err(), Error::LockPoisoned);
}
