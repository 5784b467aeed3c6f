//! Behaviour of pools built by every constructor, on plain worker threads.

use std::alloc::Layout;
use std::thread;

use nebula_arena_pool::prelude::*;
use nebula_arena_pool::utils::is_aligned;
use pretty_assertions::assert_eq;
use rstest::rstest;

const POOL_SIZE: usize = 64;

#[derive(Debug, Clone, Copy)]
enum Factory {
    Size,
    Aligned,
    Layout,
}

fn pool_of(factory: Factory, size: usize) -> ArenaPool {
    match factory {
        Factory::Size => ArenaPool::create(size).unwrap(),
        Factory::Aligned => ArenaPool::create_aligned(size, 16).unwrap(),
        Factory::Layout => ArenaPool::with_layout(Layout::from_size_align(size, 8).unwrap()),
    }
}

fn in_range(address: usize, base: usize, size: usize) -> bool {
    (base..base + size).contains(&address)
}

#[test]
fn invariants() {
    assert!(ArenaPool::create(0).is_ok());
    assert!(ArenaPool::create_aligned(0, 1).is_ok());

    let negative = (-1_isize) as usize;
    assert!(ArenaPool::create(negative).unwrap_err().is_invalid_argument());
    assert!(ArenaPool::create_aligned(negative, 8).unwrap_err().is_invalid_argument());
    assert!(ArenaPool::create_aligned(POOL_SIZE, 3).unwrap_err().is_invalid_argument());
    assert!(ArenaPool::create_aligned(POOL_SIZE, 0).unwrap_err().is_invalid_argument());
    assert!(
        ArenaPool::create_aligned(isize::MAX as usize, 16)
            .unwrap_err()
            .is_invalid_argument()
    );
}

#[rstest]
fn negative_allocation(#[values(Factory::Size, Factory::Aligned, Factory::Layout)] factory: Factory) {
    let pool = pool_of(factory, POOL_SIZE);
    let mut lease = pool.take();
    let err = lease.allocate((-1_isize) as usize, 1).unwrap_err();
    assert_eq!(err.code(), "MEM:ARG:INVALID");
    lease.close().unwrap();
}

#[rstest]
fn allocate_and_close_from_another_thread(
    #[values(Factory::Size, Factory::Aligned, Factory::Layout)] factory: Factory,
) {
    let pool = pool_of(factory, POOL_SIZE);
    let lease = pool.take();

    let (mut lease, allocate, close) = thread::spawn(move || {
        let mut lease = lease;
        let allocate = lease.allocate(8, 1).map(drop);
        let close = lease.close();
        (lease, allocate, close)
    })
    .join()
    .unwrap();

    assert!(allocate.unwrap_err().is_wrong_thread());
    assert!(close.unwrap_err().is_wrong_thread());
    assert!(lease.is_open());

    // The owner can still finish the job.
    lease.allocate(8, 1).unwrap();
    lease.close().unwrap();
    assert!(!lease.is_open());
}

#[rstest]
fn close_from_another_thread_then_owner(
    #[values(Factory::Size, Factory::Aligned, Factory::Layout)] factory: Factory,
) {
    let pool = pool_of(factory, POOL_SIZE);
    let mut lease = pool.take();
    let segment = lease.allocate(8, 1).unwrap();

    let (mut lease, close) = thread::spawn(move || {
        let mut lease = lease;
        let close = lease.close();
        (lease, close)
    })
    .join()
    .unwrap();
    assert!(close.unwrap_err().is_wrong_thread());
    segment.set_u8(0, 1).unwrap();

    lease.close().unwrap();
    assert!(segment.get_u8(0).unwrap_err().is_already_closed());
}

#[rstest]
fn reuse(#[values(Factory::Size, Factory::Aligned, Factory::Layout)] factory: Factory) {
    let pool = pool_of(factory, POOL_SIZE);

    let mut first = pool.take();
    let a = first.allocate(POOL_SIZE, 1).unwrap();
    first.close().unwrap();

    let mut second = pool.take();
    let b = second.allocate(POOL_SIZE, 1).unwrap();

    assert_eq!(a.address(), b.address());
    assert_ne!(a.scope(), b.scope());
    assert!(a.get_u8(0).unwrap_err().is_already_closed());
    assert_eq!(b.get_u8(0).unwrap(), 0);
    second.close().unwrap();
}

#[rstest]
fn layout_allocation(#[values(Factory::Size, Factory::Aligned, Factory::Layout)] factory: Factory) {
    let pool = pool_of(factory, POOL_SIZE);
    let mut lease = pool.take();
    let head = lease.allocate(1, 1).unwrap();
    let words = lease.allocate_layout(Layout::new::<[u64; 2]>()).unwrap();

    assert_eq!(words.byte_size(), 16);
    assert!(is_aligned(words.address(), 8));
    assert!(in_range(words.address(), head.address(), POOL_SIZE));
    assert_eq!(words.to_vec().unwrap(), vec![0; 16]);
    lease.close().unwrap();
}

#[rstest]
fn large_allocation(#[values(Factory::Size, Factory::Aligned, Factory::Layout)] factory: Factory) {
    let pool = pool_of(factory, POOL_SIZE);

    let mut scout = pool.take();
    let base = scout.allocate(1, 1).unwrap().address();
    scout.close().unwrap();

    let mut lease = pool.take();
    let large = lease.allocate(POOL_SIZE * 2, 8).unwrap();
    assert!(!in_range(large.address(), base, POOL_SIZE));
    assert_eq!(large.to_vec().unwrap(), vec![0; POOL_SIZE * 2]);
    lease.close().unwrap();
}

#[rstest]
fn allocation_same_as_pool_size(
    #[values(Factory::Size, Factory::Aligned, Factory::Layout)] factory: Factory,
) {
    const CAPACITY: usize = 4;
    let pool = pool_of(factory, CAPACITY);

    let mut first_address = None;
    for _ in 0..10 {
        let mut lease = pool.take();
        let pooled = lease.allocate(CAPACITY, 1).unwrap();
        let expected = *first_address.get_or_insert(pooled.address());
        assert_eq!(pooled.address(), expected);

        let spilled = lease.allocate(CAPACITY, 1).unwrap();
        assert_ne!(spilled.address(), pooled.address());
        lease.close().unwrap();
    }
}

#[rstest]
fn empty_pool_serves_from_fallback(
    #[values(Factory::Size, Factory::Aligned, Factory::Layout)] factory: Factory,
) {
    let pool = pool_of(factory, 0);
    let mut lease = pool.take();
    let segment = lease.allocate(1, 1).unwrap();
    segment.set_u8(0, 42).unwrap();
    assert_eq!(segment.get_u8(0).unwrap(), 42);
    lease.close().unwrap();
}

#[rstest]
fn zeroing(#[values(Factory::Size, Factory::Aligned, Factory::Layout)] factory: Factory) {
    let pool = pool_of(factory, POOL_SIZE);

    let mut dirty = pool.take();
    dirty.allocate(POOL_SIZE, 1).unwrap().fill(0xAB).unwrap();
    dirty.close().unwrap();

    let mut clean = pool.take();
    let segment = clean.allocate(POOL_SIZE, 1).unwrap();
    assert_eq!(segment.to_vec().unwrap(), vec![0; POOL_SIZE]);
    clean.close().unwrap();
}

#[rstest]
fn alignment_is_honoured(#[values(1, 2, 8, 32)] align: usize) {
    let pool = ArenaPool::create_aligned(POOL_SIZE, 16).unwrap();
    let mut lease = pool.take();
    lease.allocate(3, 1).unwrap();
    let segment = lease.allocate(4, align).unwrap();
    assert!(is_aligned(segment.address(), align));
    lease.close().unwrap();
}

#[test]
fn out_of_order_close() {
    let pool = ArenaPool::create(POOL_SIZE).unwrap();

    let mut outer = pool.take();
    let a = outer.allocate(8, 1).unwrap();
    let mut inner = pool.take();
    let b = inner.allocate(8, 1).unwrap();
    assert_eq!(b.address(), a.address() + 8);

    outer.close().unwrap();
    let c = inner.allocate(8, 1).unwrap();
    assert_eq!(c.address(), b.address() + 8);
    inner.close().unwrap();

    // Everything closed: the next lease starts over at the segment base.
    let mut next = pool.take();
    assert_eq!(next.allocate(8, 1).unwrap().address(), a.address());
    next.close().unwrap();
}

#[test]
fn nested_leases_never_overlap() {
    let pool = ArenaPool::create_aligned(POOL_SIZE, 8).unwrap();
    let mut leases: Vec<Lease> = (0..4).map(|_| pool.take()).collect();
    let mut addresses = Vec::new();
    for (index, lease) in leases.iter_mut().enumerate() {
        let segment = lease.allocate(8, 8).unwrap();
        segment.set_u64(0, index as u64).unwrap();
        addresses.push(segment.address());
    }
    assert!(addresses.windows(2).all(|pair| pair[1] >= pair[0] + 8));

    for lease in &mut leases {
        lease.close().unwrap();
    }
}

#[test]
fn use_after_free() {
    let pool = ArenaPool::create(POOL_SIZE).unwrap();
    let mut lease = pool.take();
    let segment = lease.allocate(8, 1).unwrap();
    lease.close().unwrap();

    let err = segment.set_u8(0, 1).unwrap_err();
    assert_eq!(err.to_string(), "Already closed");
    assert_eq!(err, MemoryError::AlreadyClosed);
    assert!(lease.allocate(8, 1).unwrap_err().is_already_closed());
    assert!(lease.close().unwrap_err().is_already_closed());
}

#[test]
fn dropped_lease_is_closed() {
    let pool = ArenaPool::create(POOL_SIZE).unwrap();
    let segment = {
        let mut lease = pool.take();
        lease.allocate(8, 1).unwrap()
    };
    assert!(segment.get_u8(0).unwrap_err().is_already_closed());

    let mut lease = pool.take();
    assert_eq!(lease.allocate(8, 1).unwrap().address(), segment.address());
    lease.close().unwrap();
}

#[test]
fn to_string() {
    let pool = ArenaPool::create(POOL_SIZE).unwrap();
    assert!(format!("{pool:?}").contains("ArenaPool"));

    let mut lease = pool.take();
    assert!(lease.is_pooled());
    assert!(format!("{lease:?}").contains("SlicingArena"));
    lease.close().unwrap();
}

#[test]
fn forced_exclusive_variant_on_plain_thread() {
    let config = ArenaPoolConfig::new(POOL_SIZE).with_variant(VariantSelection::Exclusive);
    let pool = ArenaPool::with_config(config).unwrap();

    let mut winner = pool.take();
    let mut loser = pool.take();
    assert!(winner.is_pooled());
    assert!(!loser.is_pooled());

    let a = winner.allocate(POOL_SIZE, 1).unwrap();
    let b = loser.allocate(POOL_SIZE, 1).unwrap();
    assert!(!in_range(b.address(), a.address(), POOL_SIZE));

    loser.close().unwrap();
    winner.close().unwrap();
    assert!(pool.take().is_pooled());
}

#[test]
fn stats_follow_usage() {
    let pool = ArenaPool::with_config(ArenaPoolConfig::new(16).with_stats(true)).unwrap();
    for _ in 0..3 {
        let mut lease = pool.take();
        lease.allocate(16, 1).unwrap();
        lease.allocate(1, 1).unwrap();
        lease.close().unwrap();
    }

    assert_eq!(
        pool.stats(),
        PoolStats {
            leases_taken: 3,
            pooled_leases: 3,
            fallback_leases: 0,
            sliced_allocations: 3,
            spilled_allocations: 3,
        }
    );
    assert_eq!(pool.stats().hit_rate(), 1.0);
}

#[test]
fn pools_are_independent() {
    let first = ArenaPool::create(POOL_SIZE).unwrap();
    let second = ArenaPool::create(POOL_SIZE).unwrap();

    let mut a = first.take();
    let mut b = second.take();
    let x = a.allocate(POOL_SIZE, 1).unwrap();
    let y = b.allocate(POOL_SIZE, 1).unwrap();
    assert!(!in_range(y.address(), x.address(), POOL_SIZE));
    a.close().unwrap();
    b.close().unwrap();
}
