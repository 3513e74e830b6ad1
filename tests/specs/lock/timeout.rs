//! Acquisition timeout specs
//!
//! A blocked party gives up after the acquisition timeout, reports the phase
//! it was stuck in, and leaves nothing behind that would block others.

use crate::prelude::*;
use rwl_core::{Phase, ReaderPhase, WriterPhase};

#[tokio::test]
async fn reader_times_out_behind_a_slow_writer() {
    let (locker, _clock) = virtual_lock("slow-writer", virtual_config());
    let writer = locker.acquire_write().await.unwrap();

    let err = participant(&locker, "reader")
        .acquire_read()
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LockError::Timeout {
            phase: Phase::Reader(ReaderPhase::WaitingForWriterClear),
            waited: Duration::from_millis(500),
        }
    );
    assert_eq!(locker.store().counter(&locker.keys().reader_count), 0);
    writer.release().await.unwrap();
}

#[tokio::test]
async fn writer_times_out_behind_a_slow_writer_without_disturbing_it() {
    let (locker, _clock) = virtual_lock("slow-writer", virtual_config());
    let holder = locker.acquire_write().await.unwrap();

    let err = participant(&locker, "late")
        .acquire_write()
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LockError::Timeout {
            phase: Phase::Writer(WriterPhase::IntentSet),
            waited: Duration::from_millis(500),
        }
    );
    // Readers must still be kept out while the holder works
    assert!(locker.try_read().await.unwrap().is_none());
    assert_eq!(
        locker.store().value(&locker.keys().mutex).as_deref(),
        Some(holder.token())
    );

    holder.release().await.unwrap();
    assert_eq!(locker.store().value(&locker.keys().writer_intent), None);
    let reader = locker.try_read().await.unwrap().unwrap();
    reader.release().await.unwrap();
}

#[tokio::test]
async fn writer_times_out_behind_a_slow_reader_and_rolls_back() {
    let (locker, _clock) = virtual_lock("slow-reader", virtual_config());
    let reader = locker.acquire_read().await.unwrap();

    let err = participant(&locker, "writer")
        .acquire_write()
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LockError::Timeout {
            phase: Phase::Writer(WriterPhase::DrainingReaders),
            waited: Duration::from_millis(500),
        }
    );
    assert_eq!(locker.store().value(&locker.keys().mutex), None);
    assert_eq!(locker.store().value(&locker.keys().writer_intent), None);

    // New readers are not shut out by the abandoned attempt
    let second = locker.try_read().await.unwrap().unwrap();
    second.release().await.unwrap();
    reader.release().await.unwrap();
    assert_eq!(locker.store().counter(&locker.keys().reader_count), 0);
}

#[tokio::test]
async fn scoped_work_does_not_run_after_a_timeout() {
    let (locker, _clock) = virtual_lock("scoped-timeout", virtual_config());
    let holder = locker.acquire_write().await.unwrap();

    let result = participant(&locker, "reader")
        .read(|| async { Ok::<_, Infallible>(unreachable!("work ran without the lock")) })
        .await;

    match result {
        Err(ScopedError::Acquire(e)) => assert!(e.is_timeout()),
        other => panic!("expected acquisition timeout, got {:?}", other),
    }
    holder.release().await.unwrap();
}
