// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use statsd_sink::{ExcludedTags, MetricSink, StatsdClient};
use tokio::{
    net::UdpSocket,
    time::{timeout, Duration},
};

async fn receive(socket: &UdpSocket) -> String {
    let mut buf = [0u8; 1024];
    let amt = timeout(Duration::from_secs(2), socket.recv(&mut buf))
        .await
        .expect("timed out waiting for datagram")
        .expect("unable to receive datagram");
    String::from_utf8(buf[..amt].to_vec()).expect("datagram is not utf8")
}

#[tokio::test]
async fn statsd_client_sends_one_datagram_per_call() {
    let server = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("unable to bind UDP socket");
    let addr = server.local_addr().expect("no local address").to_string();

    let client = StatsdClient::new(&addr, ExcludedTags::default())
        .await
        .expect("failed to create statsd client");
    let tags = vec!["env:prod".to_string(), "app:web".to_string()];

    client
        .timing("connect", 5.0, &tags)
        .await
        .expect("timing failed");
    client
        .count("requests", 1.0, &tags)
        .await
        .expect("count failed");
    client.gauge("bytes", 1548.0, &[]).await.expect("gauge failed");

    assert_eq!(receive(&server).await, "connect:5|ms|#env:prod,app:web");
    assert_eq!(receive(&server).await, "requests:1|c|#env:prod,app:web");
    assert_eq!(receive(&server).await, "bytes:1548|g");
}

#[tokio::test]
async fn statsd_client_rejects_unresolvable_address() {
    let result = StatsdClient::new("not a host", ExcludedTags::default()).await;
    assert!(result.is_err());
}
