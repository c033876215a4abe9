use super::*;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use futures::FutureExt;

fn counting_callback(counter: Arc<AtomicUsize>) -> JobCallback {
    Arc::new(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    })
}

fn noop_callback() -> JobCallback {
    Arc::new(|| async {}.boxed())
}

#[test]
fn test_parse_schedule() {
    assert!(parse_schedule("0 0 * * * *").is_ok());
    assert!(parse_schedule("0 30 9 * * MON-FRI").is_ok());
    assert!(parse_schedule("0 0 0 1 1 * 2099").is_ok());
}

#[test]
fn test_parse_schedule_rejects_garbage() {
    let err = parse_schedule("not a cron").unwrap_err();
    assert!(matches!(err, JobError::Schedule { .. }));
    assert!(err.to_string().contains("not a cron"));

    let err = parse_schedule("   ").unwrap_err();
    assert!(err.to_string().contains("cannot be empty"));
}

#[tokio::test]
async fn test_add_computes_next_run_before_start() {
    let scheduler = CronScheduler::new();
    let id = scheduler.add("0 0 0 1 1 *", noop_callback()).unwrap();

    assert!(!scheduler.is_running());
    let next = scheduler.next_run(id).unwrap();
    assert!(next > Utc::now());
    assert_eq!(scheduler.len(), 1);
}

#[tokio::test]
async fn test_add_invalid_expression_registers_nothing() {
    let scheduler = CronScheduler::new();
    assert!(scheduler.add("61 * * * * *", noop_callback()).is_err());
    assert!(scheduler.is_empty());
}

#[tokio::test]
async fn test_entry_ids_are_unique() {
    let scheduler = CronScheduler::new();
    let a = scheduler.add("0 0 * * * *", noop_callback()).unwrap();
    let b = scheduler.add("0 0 * * * *", noop_callback()).unwrap();
    assert_ne!(a, b);
    assert!(scheduler.contains(a));
    assert!(scheduler.contains(b));
}

#[tokio::test]
async fn test_remove() {
    let scheduler = CronScheduler::new();
    let id = scheduler.add("0 0 * * * *", noop_callback()).unwrap();

    assert!(scheduler.remove(id));
    assert!(!scheduler.remove(id));
    assert!(scheduler.next_run(id).is_none());
    assert!(scheduler.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fires_every_second() {
    let scheduler = CronScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler
        .add("* * * * * *", counting_callback(counter.clone()))
        .unwrap();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler.stop();

    assert!(counter.load(Ordering::SeqCst) >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_entry_added_while_running_fires() {
    let scheduler = CronScheduler::new();
    scheduler.start();

    let counter = Arc::new(AtomicUsize::new(0));
    scheduler
        .add("* * * * * *", counting_callback(counter.clone()))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler.stop();

    assert!(counter.load(Ordering::SeqCst) >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_fires_after_stop() {
    let scheduler = CronScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    scheduler
        .add("* * * * * *", counting_callback(counter.clone()))
        .unwrap();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    scheduler.stop();
    assert!(!scheduler.is_running());

    let after_stop = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(counter.load(Ordering::SeqCst), after_stop);

    // Registrations survive a stop.
    assert_eq!(scheduler.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_fires_after_remove() {
    let scheduler = CronScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let id = scheduler
        .add("* * * * * *", counting_callback(counter.clone()))
        .unwrap();

    scheduler.start();
    assert!(scheduler.remove(id));
    tokio::time::sleep(Duration::from_millis(2000)).await;
    scheduler.stop();

    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_callback_does_not_block_timer() {
    let scheduler = CronScheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let slow_counter = counter.clone();
    let callback: JobCallback = Arc::new(move || {
        let counter = slow_counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        .boxed()
    });
    scheduler.add("* * * * * *", callback).unwrap();

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    scheduler.stop();

    assert!(counter.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_next_run_advances_while_running() {
    let scheduler = CronScheduler::new();
    let id = scheduler.add("* * * * * *", noop_callback()).unwrap();
    scheduler.start();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let next = scheduler.next_run(id).unwrap();
    assert!(next > Utc::now() - chrono::Duration::seconds(1));
    scheduler.stop();
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let scheduler = CronScheduler::new();
    scheduler.start();
    scheduler.start();
    assert!(scheduler.is_running());
    scheduler.stop();
    scheduler.stop();
    assert!(!scheduler.is_running());
}
