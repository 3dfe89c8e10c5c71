use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sonar_common::network::host::Host;
use sonar_common::network::interface::AdapterInfo;
use sonar_core::announce::AnnouncementCallback;
use sonar_core::{ResolveError, Resolver};
use sonar_protocols::fixture::PacketBuilder;
use tokio_util::sync::CancellationToken;

use crate::support::{ReplayTransport, adapter, ip, service_response};

#[tokio::test]
async fn announcements_are_reported_until_cancelled() {
    let eth0 = adapter("eth0", Ipv4Addr::new(10, 0, 0, 1));
    let announcement = service_response(
        "_airplay._tcp.local.",
        "Living Room",
        "tv.local.",
        Ipv4Addr::new(10, 0, 0, 30),
        7000,
    );
    let transport = Arc::new(
        ReplayTransport::new()
            .announcement(eth0.clone(), (ip(10, 0, 0, 30), announcement))
            .announcement(eth0, (ip(10, 0, 0, 31), PacketBuilder::query().build())),
    );

    let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let on_host: AnnouncementCallback = {
        let seen = seen.clone();
        Arc::new(move |adapter: &AdapterInfo, host: &Host| {
            seen.lock().unwrap().push((adapter.name.clone(), host.id.clone()));
        })
    };

    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    Resolver::new(transport)
        .listen_for_announcements(on_host, &cancel)
        .await
        .unwrap();
    canceller.await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec![("eth0".to_string(), "10.0.0.30".to_string())]);
}

#[tokio::test]
async fn listening_with_a_cancelled_token_is_an_error() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let on_host: AnnouncementCallback = Arc::new(|_: &AdapterInfo, _: &Host| {});

    let result = Resolver::new(Arc::new(ReplayTransport::new()))
        .listen_for_announcements(on_host, &cancel)
        .await;

    assert!(matches!(result, Err(ResolveError::Cancelled)));
}
