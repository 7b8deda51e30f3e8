use std::net::TcpListener;
use std::time::Duration;

use tcping_rs::sink::CollectingSink;
use tcping_rs::socket::open_sockets;
use tcping_rs::{run, JobStatus, ProbeJob, ProbeJobConfig};
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

// Kept as the only test in this binary: it reads the process-wide socket count.
#[tokio::test]
async fn cancelling_mid_attempt_closes_the_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut c = ProbeJobConfig::new("127.0.0.1");
    c.port = port;
    c.continuous = true;
    c.timeout_ms = 10_000;
    let cancel = CancellationToken::new();
    let job = ProbeJob::new(c, cancel.clone()).unwrap();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let mut sink = CollectingSink::default();
    let outcome = timeout(Duration::from_secs(5), run(job, &mut sink))
        .await
        .expect("worker ignored cancellation")
        .unwrap();

    assert_eq!(outcome.status, JobStatus::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(2));
    // the in-flight attempt was abandoned, not counted
    assert_eq!(outcome.statistics.unwrap().sent, 0);
    assert_eq!(sink.events().count(), 0);
    assert_eq!(open_sockets(), 0);
}
