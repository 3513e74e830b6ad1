//! Shared fixtures for the lock specs
//!
//! Every participant of one lock instance shares a single in-memory store,
//! standing in for separate processes talking to the same server.

pub use rwl_adapters::{CoordinationStore, FakeStore, StoreOp, TracedStore};
pub use rwl_core::{Clock, FakeClock, LockConfig, LockKeys, SequentialIdGen, SystemClock};
pub use rwl_engine::{LockError, Locker, ScopedError};
pub use std::convert::Infallible;
pub use std::sync::Arc;
pub use std::time::Duration;

/// Locker on real time, for specs with concurrent tasks
pub type LiveLocker = Locker<FakeStore, SystemClock, SequentialIdGen>;

/// Locker on virtual time, for specs that wait out expiry
pub type VirtualLocker = Locker<FakeStore<FakeClock>, FakeClock, SequentialIdGen>;

pub fn live_config() -> LockConfig {
    LockConfig::new()
        .with_retry_interval(Duration::from_millis(1))
        .with_acquisition_timeout(Duration::from_secs(10))
        .with_key_expiry(Duration::from_secs(5))
}

pub fn virtual_config() -> LockConfig {
    LockConfig::new()
        .with_retry_interval(Duration::from_millis(10))
        .with_acquisition_timeout(Duration::from_millis(500))
        .with_key_expiry(Duration::from_secs(2))
}

/// One lock instance on real time
pub fn live_lock(name: &str) -> LiveLocker {
    Locker::new(FakeStore::new(), LockKeys::with_prefix(name), live_config())
        .unwrap()
        .with_id_gen(SequentialIdGen::new(name))
}

/// One lock instance on virtual time, plus the clock driving it
pub fn virtual_lock(name: &str, config: LockConfig) -> (VirtualLocker, FakeClock) {
    let clock = FakeClock::new();
    let locker = Locker::new(
        FakeStore::with_clock(clock.clone()),
        LockKeys::with_prefix(name),
        config,
    )
    .unwrap()
    .with_clock(clock.clone())
    .with_id_gen(SequentialIdGen::new(name));
    (locker, clock)
}

/// A second participant of `locker`'s lock instance with its own token sequence
pub fn participant<S, C>(locker: &Locker<S, C, SequentialIdGen>, name: &str) -> Locker<S, C, SequentialIdGen>
where
    S: CoordinationStore,
    C: Clock,
{
    locker.clone().with_id_gen(SequentialIdGen::new(name))
}

/// Let background releases spawned by dropped guards run
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
