//! Scoped execution specs
//!
//! `read` and `write` always release, hand back the work's own error
//! unchanged, and report release failures without hiding that error.

use crate::prelude::*;

#[derive(Debug, PartialEq)]
struct WorkFailed(&'static str);

impl std::fmt::Display for WorkFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed", self.0)
    }
}

#[tokio::test]
async fn read_returns_the_work_value() {
    let locker = live_lock("scoped-read");

    let total = locker
        .read(|| async { Ok::<_, Infallible>(2 + 2) })
        .await
        .unwrap();

    assert_eq!(total, 4);
    assert_eq!(locker.store().counter(&locker.keys().reader_count), 0);
}

#[tokio::test]
async fn work_error_comes_back_unchanged_and_lock_is_free() {
    let locker = live_lock("scoped-error");

    let err = locker
        .write(|| async { Err::<(), _>(WorkFailed("validation")) })
        .await
        .unwrap_err();

    assert_eq!(err.into_work_error(), Some(WorkFailed("validation")));
    let guard = locker.try_write().await.unwrap().unwrap();
    guard.release().await.unwrap();
}

#[tokio::test]
async fn release_failure_after_good_work_is_reported() {
    let locker = live_lock("scoped-release");
    let store = locker.store().clone();
    let keys = locker.keys().clone();

    let err = locker
        .write(|| async {
            store.fail_on(StoreOp::DeleteIfEquals, &keys.mutex);
            Ok::<_, Infallible>(())
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScopedError::Release(LockError::Coordination(_))
    ));
    assert!(err.work_error().is_none());
    // The intent flag was still cleared; the mutex is left to its TTL
    assert_eq!(store.value(&keys.writer_intent), None);
    assert!(store.ttl(&keys.mutex).is_some());
}

#[tokio::test]
async fn work_and_release_failures_are_both_reported() {
    let locker = live_lock("scoped-both");
    let store = locker.store().clone();
    let keys = locker.keys().clone();

    let err = locker
        .read(|| async {
            store.fail_on(StoreOp::Increment, &keys.reader_count);
            Err::<(), _>(WorkFailed("parse"))
        })
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("parse failed"), "{}", message);
    assert!(message.contains("release also failed"), "{}", message);
    assert!(err.lock_error().is_some());
    assert_eq!(err.into_work_error(), Some(WorkFailed("parse")));
}

#[tokio::test]
async fn extra_release_does_not_drive_the_count_negative() {
    let locker = live_lock("double-cleanup");

    let guard = locker.acquire_read().await.unwrap();
    // A buggy participant releases a registration that is not its own
    locker
        .store()
        .increment(&locker.keys().reader_count, -1)
        .await
        .unwrap();

    let err = guard.release().await.unwrap_err();

    assert!(matches!(err, LockError::ConsistencyViolation { .. }));
    assert!(!err.is_retryable());
    assert_eq!(locker.store().counter(&locker.keys().reader_count), 0);
    let writer = locker.try_write().await.unwrap().unwrap();
    writer.release().await.unwrap();
}

#[tokio::test]
async fn released_guards_are_not_released_again() {
    let locker = live_lock("release-once");

    let guard = locker.acquire_read().await.unwrap();
    guard.release().await.unwrap();
    let writer = locker.acquire_write().await.unwrap();
    writer.release().await.unwrap();
    settle().await;

    assert_eq!(locker.store().counter(&locker.keys().reader_count), 0);
    assert_eq!(locker.store().calls_of(StoreOp::Increment).len(), 2);
    assert_eq!(locker.store().calls_of(StoreOp::DeleteIfEquals).len(), 2);
}

#[tokio::test]
async fn locks_work_through_a_traced_store() {
    let store = TracedStore::new(FakeStore::new());
    let locker = Locker::new(store, LockKeys::with_prefix("traced"), live_config()).unwrap();

    let value = locker
        .write(|| async { Ok::<_, Infallible>("done") })
        .await
        .unwrap();
    locker
        .read(|| async { Ok::<_, Infallible>(()) })
        .await
        .unwrap();

    assert_eq!(value, "done");
    let inner = locker.store().inner();
    assert_eq!(inner.value(&locker.keys().mutex), None);
    assert_eq!(inner.counter(&locker.keys().reader_count), 0);
}
