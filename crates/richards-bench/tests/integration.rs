//! Integration tests for the richards-bench crate.
//!
//! Configuration files on disk feed the driver, the bus carries events to
//! independent subscribers and a stop request from another task ends a
//! series early.

use std::io::Write;
use std::time::Duration;

use richards_bench::{BenchError, BenchmarkConfig, BenchmarkDriver, Event, IpcBus};
use richards_kernel::{ExpectedCounts, KernelError};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

// ═══════════════════════════════════════════════════════════════════════
//  Config file to report
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn config_file_drives_the_benchmark() {
    let file = write_config(
        "[benchmark]\n\
         iterations = 6\n\
         min_iterations = 1\n\
         idle_count = 2\n\
         expected_queue_count = 12\n\
         expected_hold_count = 4\n\
         sample_resources = false\n",
    );
    let config = BenchmarkConfig::load(file.path()).expect("load");
    let report = BenchmarkDriver::new(config).run().await.expect("run");

    assert_eq!(report.runs, 6);
    let outcome = report.outcome.expect("outcome");
    assert_eq!((outcome.queue_count, outcome.hold_count), (12, 4));
}

#[tokio::test]
async fn wrong_expectations_in_file_fail_the_run() {
    let file = write_config(
        "[benchmark]\n\
         iterations = 2\n\
         min_iterations = 1\n\
         expected_hold_count = 927\n",
    );
    let config = BenchmarkConfig::load(file.path()).expect("load");
    let err = BenchmarkDriver::new(config).run().await.unwrap_err();

    match err {
        BenchError::Kernel(KernelError::CounterMismatch {
            hold_count,
            expected_hold_count,
            ..
        }) => {
            assert_eq!(hold_count, 928);
            assert_eq!(expected_hold_count, 927);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_file_values_are_rejected_on_load() {
    let file = write_config("[benchmark]\nidle_count = 0\n");
    let err = BenchmarkConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, BenchError::InvalidConfig { .. }));
}

#[tokio::test]
async fn report_serializes_to_json() {
    let config = BenchmarkConfig::new()
        .with_iterations(2)
        .with_min_iterations(1)
        .with_sample_resources(false);
    let report = BenchmarkDriver::new(config).run().await.expect("run");

    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["runs"], 2);
    assert_eq!(json["outcome"]["queue_count"], 2322);
    assert_eq!(json["stopped_early"], false);
    assert!(json["run_id"].is_string());
}

// ═══════════════════════════════════════════════════════════════════════
//  Bus and cooperative stop
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn every_subscriber_sees_the_same_lifecycle() {
    let bus = IpcBus::new(64);
    let mut a = bus.subscribe();
    let mut b = bus.subscribe();

    let config = BenchmarkConfig::new()
        .with_iterations(3)
        .with_min_iterations(1)
        .with_workload(2, ExpectedCounts { queue_count: 12, hold_count: 4 })
        .with_sample_resources(false);
    BenchmarkDriver::new(config)
        .with_bus(bus)
        .run()
        .await
        .expect("run");

    for rx in [&mut a, &mut b] {
        let started = rx.try_recv().expect("started");
        assert!(matches!(started.as_ref(), Event::BenchmarkStarted { .. }));
        let completed = rx.try_recv().expect("completed");
        assert!(matches!(
            completed.as_ref(),
            Event::BenchmarkCompleted { runs: 3, .. }
        ));
    }
}

#[tokio::test]
async fn stop_from_another_task_ends_the_series() {
    let bus = IpcBus::new(64);
    let mut rx = bus.subscribe();

    // Far more iterations than can finish before the stop lands.
    let config = BenchmarkConfig::new()
        .with_iterations(1_000_000)
        .with_sample_resources(false);
    let driver = BenchmarkDriver::new(config).with_bus(bus);
    let stop = driver.stop_handle();

    let runner = tokio::spawn(async move { driver.run().await });

    // Wait until the driver is running, then stop it.
    let started = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("started within timeout")
        .expect("bus open");
    assert!(matches!(started.as_ref(), Event::BenchmarkStarted { .. }));
    stop.stop();

    let report = tokio::time::timeout(Duration::from_secs(30), runner)
        .await
        .expect("driver stops")
        .expect("task did not panic")
        .expect("run");
    assert!(report.stopped_early);
    assert!(report.runs < 1_000_000);
}
