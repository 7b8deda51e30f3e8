use std::fs;
use std::net::TcpListener;

use tcping_rs::sink::CollectingSink;
use tcping_rs::{run, ProbeError, ProbeJob, ProbeJobConfig};
use tokio_util::sync::CancellationToken;

fn job_config(port: u16, path: std::path::PathBuf, append: bool) -> ProbeJobConfig {
    let mut c = ProbeJobConfig::new("127.0.0.1");
    c.port = port;
    c.count = 2;
    c.interval_ms = 1;
    c.output_file = Some(path);
    c.append_to_file = append;
    c
}

#[tokio::test]
async fn results_go_to_file_not_host() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("probe.txt");

    let job = ProbeJob::new(job_config(port, path.clone(), false), CancellationToken::new()).unwrap();
    let mut host = CollectingSink::default();
    run(job, &mut host).await.unwrap();

    assert!(host.messages.is_empty());
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("Port is open").count(), 2);
    assert!(text.contains(&format!("Probing statistics for 127.0.0.1:{port}:")));
    assert!(text.contains("Attempted = 2, Connected = 2, Failed = 0 (0.00% fail)"));
}

#[tokio::test]
async fn append_mode_keeps_previous_runs() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("probe.txt");

    for append in [false, true] {
        let job = ProbeJob::new(job_config(port, path.clone(), append), CancellationToken::new())
            .unwrap();
        run(job, &mut CollectingSink::default()).await.unwrap();
    }
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("Probing statistics").count(), 2);

    let job = ProbeJob::new(job_config(port, path.clone(), false), CancellationToken::new()).unwrap();
    run(job, &mut CollectingSink::default()).await.unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("Probing statistics").count(), 1);
}

#[test]
fn missing_directory_fails_before_probing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("probe.txt");
    let err = ProbeJob::new(job_config(80, path, false), CancellationToken::new()).unwrap_err();
    assert!(matches!(err, ProbeError::FileIo { .. }));
}
