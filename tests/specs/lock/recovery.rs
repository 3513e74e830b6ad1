//! Crash recovery specs
//!
//! A participant that disappears while holding the lock never runs its
//! release. Mutex and intent carry a TTL and free themselves; the reader
//! count does not.

use crate::prelude::*;
use rwl_adapters::StoreError;

/// Store whose intent reads hang once any reader has registered
#[derive(Clone)]
struct StallAfterRegister {
    inner: FakeStore,
    keys: Arc<LockKeys>,
}

#[async_trait::async_trait]
impl CoordinationStore for StallAfterRegister {
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        self.inner.increment(key, delta).await
    }
    async fn try_set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.inner.try_set_with_expiry(key, value, ttl).await
    }
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.inner.set_with_expiry(key, value, ttl).await
    }
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if key == self.keys.writer_intent && self.inner.counter(&self.keys.reader_count) > 0 {
            std::future::pending::<()>().await;
        }
        self.inner.get(key).await
    }
    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }
    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        self.inner.delete_if_equals(key, value).await
    }
    async fn expire_if_equals(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.inner.expire_if_equals(key, value, ttl).await
    }
}

#[tokio::test]
async fn crashed_writer_frees_the_lock_after_key_expiry() {
    let config = virtual_config().with_acquisition_timeout(Duration::from_secs(5));
    let (locker, clock) = virtual_lock("crash", config);
    let survivor = participant(&locker, "survivor");

    let crashed = locker.acquire_write().await.unwrap();
    std::mem::forget(crashed);
    let start = clock.now();

    let guard = survivor.acquire_write().await.unwrap();

    assert!(clock.now().duration_since(start) >= Duration::from_secs(2));
    assert_eq!(
        locker.store().value(&locker.keys().mutex).as_deref(),
        Some(guard.token())
    );
    guard.release().await.unwrap();
}

#[tokio::test]
async fn readers_resume_after_crashed_writer_expires() {
    let config = virtual_config().with_acquisition_timeout(Duration::from_secs(5));
    let (locker, clock) = virtual_lock("crash-read", config);

    std::mem::forget(locker.acquire_write().await.unwrap());
    assert!(locker.try_read().await.unwrap().is_none());

    clock.advance(Duration::from_secs(2));
    let guard = locker.try_read().await.unwrap().unwrap();
    guard.release().await.unwrap();
}

#[tokio::test]
async fn crashed_reader_blocks_writers_until_they_time_out() {
    let (locker, _clock) = virtual_lock("crash-reader", virtual_config());

    std::mem::forget(locker.acquire_read().await.unwrap());

    let err = locker.acquire_write().await.unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {}", err);
    // The writer gave everything back; only the stale registration remains
    assert_eq!(locker.store().counter(&locker.keys().reader_count), 1);
    assert_eq!(locker.store().value(&locker.keys().mutex), None);
    assert_eq!(locker.store().value(&locker.keys().writer_intent), None);
    let guard = locker.try_read().await.unwrap().unwrap();
    guard.release().await.unwrap();
}

#[tokio::test]
async fn cancelled_reader_task_releases_its_registration() {
    let locker = live_lock("cancel-read");
    let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();

    let reader = participant(&locker, "reader");
    let task = tokio::spawn(async move {
        reader
            .read(move || async move {
                let _ = entered_tx.send(());
                std::future::pending::<Result<(), Infallible>>().await
            })
            .await
    });
    entered_rx.await.unwrap();
    assert_eq!(locker.store().counter(&locker.keys().reader_count), 1);

    task.abort();
    let _ = task.await;
    settle().await;

    assert_eq!(locker.store().counter(&locker.keys().reader_count), 0);
}

#[tokio::test]
async fn cancelled_writer_task_releases_its_keys() {
    let locker = live_lock("cancel-write");
    let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();

    let writer = participant(&locker, "writer");
    let task = tokio::spawn(async move {
        writer
            .write(move || async move {
                let _ = entered_tx.send(());
                std::future::pending::<Result<(), Infallible>>().await
            })
            .await
    });
    entered_rx.await.unwrap();
    assert!(locker.store().value(&locker.keys().mutex).is_some());

    task.abort();
    let _ = task.await;
    settle().await;

    assert_eq!(locker.store().value(&locker.keys().mutex), None);
    assert_eq!(locker.store().value(&locker.keys().writer_intent), None);
    let guard = locker.try_write().await.unwrap().unwrap();
    guard.release().await.unwrap();
}

#[tokio::test]
async fn read_abandoned_during_the_intent_recheck_gives_back_its_registration() {
    let keys = LockKeys::with_prefix("abandon");
    let store = StallAfterRegister {
        inner: FakeStore::new(),
        keys: Arc::new(keys.clone()),
    };
    let locker = Locker::new(store.clone(), keys, live_config()).unwrap();

    let attempt = tokio::time::timeout(
        Duration::from_millis(50),
        locker.read(|| async { Ok::<_, Infallible>(()) }),
    )
    .await;
    assert!(attempt.is_err(), "read should still be stuck in the re-check");
    settle().await;

    assert_eq!(store.inner.counter(&locker.keys().reader_count), 0);
    let writer = Locker::new(store.inner.clone(), locker.keys().clone(), live_config())
        .unwrap()
        .try_write()
        .await
        .unwrap()
        .unwrap();
    writer.release().await.unwrap();
}
