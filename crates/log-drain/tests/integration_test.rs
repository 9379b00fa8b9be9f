// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use datadog_log_drain::registry::{AppDefaults, AppRegistry};
use datadog_log_drain::{DrainConfig, DrainServer};
use statsd_sink::{ExcludedTags, MetricSink, StatsdClient};
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct RunningDrain {
    addr: SocketAddr,
    receiver: UdpSocket,
    shutdown: CancellationToken,
    server: JoinHandle<Result<(), datadog_log_drain::DrainError>>,
}

async fn start_drain() -> RunningDrain {
    let receiver = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("failed to bind statsd receiver");
    let statsd_addr = receiver.local_addr().expect("receiver has an address");
    let client = StatsdClient::new(&statsd_addr.to_string(), ExcludedTags::parse("dyno:web.1"))
        .await
        .expect("statsd client should connect");

    let config = DrainConfig {
        statsd_url: statsd_addr.to_string(),
        basic_auth_username: "drain".to_string(),
        basic_auth_password: "s3cret".to_string(),
        app_registry: AppRegistry::default().with_app(
            "api",
            AppDefaults {
                tags: vec!["env:staging".to_string()],
                prefix: "api.".to_string(),
            },
        ),
        shutdown_timeout: Duration::from_secs(5),
        ..DrainConfig::default()
    };

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind drain listener");
    let addr = listener.local_addr().expect("listener has an address");
    let shutdown = CancellationToken::new();
    let sink: Arc<dyn MetricSink> = Arc::new(client);
    let server = tokio::spawn(DrainServer::new(config).serve(listener, sink, shutdown.clone()));

    RunningDrain {
        addr,
        receiver,
        shutdown,
        server,
    }
}

async fn receive(receiver: &UdpSocket, count: usize) -> Vec<String> {
    let mut buf = [0u8; 1024];
    let mut datagrams = Vec::with_capacity(count);
    for _ in 0..count {
        let len = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .expect("timed out waiting for a metric")
            .expect("failed to receive datagram");
        datagrams.push(String::from_utf8_lossy(&buf[..len]).into_owned());
    }
    datagrams
}

#[tokio::test]
async fn test_drain_to_statsd_end_to_end() {
    let drain = start_drain().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!(
            "http://{}/?app=web&tags=env:prod,dyno:web.1",
            drain.addr
        ))
        .basic_auth("drain", Some("s3cret"))
        .body("at=info method=GET connect=5ms service=12ms status=200\ncount#requests=1\r\nbytes=1548")
        .send()
        .await
        .expect("drain request failed");
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("body should be text"), "OK");

    drain.shutdown.cancel();
    drain
        .server
        .await
        .expect("server task panicked")
        .expect("server should shut down cleanly");

    assert_eq!(
        receive(&drain.receiver, 4).await,
        vec![
            "connect:5|ms|#env:prod,app:web",
            "service:12|ms|#env:prod,app:web",
            "requests:1|c|#env:prod,app:web",
            "bytes:1548|g|#env:prod,app:web",
        ]
    );
}

#[tokio::test]
async fn test_registry_defaults_apply() {
    let drain = start_drain().await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/?app=api", drain.addr))
        .basic_auth("drain", Some("s3cret"))
        .body("sample#load_avg=0.5")
        .send()
        .await
        .expect("drain request failed");
    assert_eq!(response.status(), 200);

    assert_eq!(
        receive(&drain.receiver, 1).await,
        vec!["api.load_avg:0.5|g|#env:staging,app:api"]
    );

    drain.shutdown.cancel();
    drain
        .server
        .await
        .expect("server task panicked")
        .expect("server should shut down cleanly");
}

#[tokio::test]
async fn test_rejected_requests() {
    let drain = start_drain().await;
    let client = reqwest::Client::new();

    let status = client
        .get(format!("http://{}/status", drain.addr))
        .send()
        .await
        .expect("status request failed");
    assert_eq!(status.status(), 200);

    let unauthorized = client
        .post(format!("http://{}/?app=web", drain.addr))
        .basic_auth("drain", Some("wrong"))
        .body("connect=5ms")
        .send()
        .await
        .expect("drain request failed");
    assert_eq!(unauthorized.status(), 401);
    assert_eq!(
        unauthorized
            .headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok()),
        Some("Basic realm=\"Authorization Required\"")
    );

    let missing_app = client
        .post(format!("http://{}/", drain.addr))
        .basic_auth("drain", Some("s3cret"))
        .body("connect=5ms")
        .send()
        .await
        .expect("drain request failed");
    assert_eq!(missing_app.status(), 500);
    assert_eq!(
        missing_app.text().await.expect("body should be text"),
        "Missing app query parameter"
    );

    drain.shutdown.cancel();
    drain
        .server
        .await
        .expect("server task panicked")
        .expect("server should shut down cleanly");

    let mut buf = [0u8; 64];
    assert!(
        tokio::time::timeout(Duration::from_millis(200), drain.receiver.recv(&mut buf))
            .await
            .is_err(),
        "rejected requests must not produce metrics"
    );
}
