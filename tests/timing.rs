//! Wall-clock timing behavior that virtual time cannot drive: callbacks that
//! genuinely run longer than the period. Serialized so the timing margins do
//! not fight other tests for CPU.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use interval_scheduler::IntervalScheduler;
use serial_test::serial;
use tokio::time::Instant;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_slow_callback_clamps_delay_to_immediate_catch_up() {
    let _ = env_logger::builder().is_test(true).try_init();

    let period = Duration::from_millis(50);
    let busy = Duration::from_millis(150);

    let starts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
    let starts_clone = starts.clone();

    let scheduler = IntervalScheduler::new();
    scheduler
        .start(
            move || {
                starts_clone.lock().unwrap().push(Instant::now());
                std::thread::sleep(busy);
                Ok(())
            },
            period,
            true,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(900)).await;
    scheduler.stop();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let starts = starts.lock().unwrap();
    assert!(
        starts.len() >= 4,
        "expected sustained catch-up ticks, got {}",
        starts.len()
    );

    // With the delay clamped to zero each tick starts as soon as the
    // previous callback returns, so the average gap sits near the callback
    // duration (150ms). A sleep-then-run loop would show period + busy
    // (200ms) instead.
    let total_span = *starts.last().unwrap() - *starts.first().unwrap();
    let average_gap = total_span / (starts.len() as u32 - 1);
    assert!(
        average_gap < Duration::from_millis(185),
        "average tick gap {:?} looks like an uncorrected sleep-then-run loop",
        average_gap
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_callbacks_never_overlap_under_catch_up() {
    let _ = env_logger::builder().is_test(true).try_init();

    let in_flight = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));

    let in_flight_clone = in_flight.clone();
    let overlapped_clone = overlapped.clone();

    let scheduler = IntervalScheduler::new();
    scheduler
        .start(
            move || {
                if in_flight_clone.swap(true, Ordering::SeqCst) {
                    overlapped_clone.store(true, Ordering::SeqCst);
                }
                std::thread::sleep(Duration::from_millis(30));
                in_flight_clone.store(false, Ordering::SeqCst);
                Ok(())
            },
            Duration::from_millis(10),
            true,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    scheduler.stop();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(
        !overlapped.load(Ordering::SeqCst),
        "two callbacks ran concurrently"
    );
}
