use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sonar_common::config::{QueryKind, ResolveOptions};
use sonar_common::network::host::Host;
use sonar_core::{HostCallback, ResolveError, ResponseCallback, Resolver};
use sonar_protocols::dns::{self, DnsResponse, Record, RecordData};
use sonar_protocols::fixture::PacketBuilder;
use tokio_util::sync::CancellationToken;

use crate::support::{Behavior, ReplayTransport, ip, service_response, services_response};

const IPP: &str = "_ipp._tcp.local.";
const HTTP: &str = "_http._tcp.local.";

fn options(protocols: &[&str]) -> ResolveOptions {
    ResolveOptions::new(protocols.iter().copied())
        .with_scan_time(Duration::from_millis(50))
        .with_retries(0)
}

fn resolver(transport: &Arc<ReplayTransport>) -> Resolver {
    Resolver::new(transport.clone())
}

fn printer(last: u8) -> (IpAddr, Vec<u8>) {
    let address = Ipv4Addr::new(10, 0, 0, last);
    let bytes = service_response(IPP, &format!("Printer-{last}"), &format!("printer{last}.local."), address, 631);
    (IpAddr::V4(address), bytes)
}

#[tokio::test]
async fn replies_from_every_adapter_are_merged_per_sender() {
    let (source, first) = printer(5);
    let second = PacketBuilder::response()
        .answer(Record::new(
            HTTP,
            4500,
            RecordData::Ptr(format!("Web.{HTTP}")),
        ))
        .build();

    let transport = Arc::new(
        ReplayTransport::new()
            .adapter(vec![(source, first), printer(6)])
            .adapter(vec![(source, second)]),
    );

    let responses = resolver(&transport)
        .resolve(&options(&[IPP, HTTP]), None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(transport.calls(), 1);
    assert_eq!(responses.len(), 2);

    let merged: &DnsResponse = &responses[&source];
    assert_eq!(merged.answers.len(), 2);
}

#[tokio::test]
async fn the_request_carries_the_encoded_query_and_timing() {
    let transport = Arc::new(ReplayTransport::new());
    let options = options(&["_ipp._tcp.local"])
        .with_query_kind(QueryKind::Any)
        .with_retries(3)
        .with_adapter("eth1");

    resolver(&transport)
        .resolve(&options, None, &CancellationToken::new())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].retries, 3);
    assert_eq!(requests[0].scan_time, Duration::from_millis(50));
    assert_eq!(requests[0].adapter.as_deref(), Some("eth1"));

    let sent = dns::decode(&requests[0].query).unwrap();
    assert!(!sent.header.is_response);
}

#[tokio::test]
async fn relayed_replies_and_query_echoes_are_ignored() {
    let relayed = service_response(IPP, "Elsewhere", "elsewhere.local.", Ipv4Addr::new(10, 0, 0, 99), 631);
    let echo = PacketBuilder::query().build();

    let transport = Arc::new(
        ReplayTransport::new().adapter(vec![(ip(10, 0, 0, 7), relayed), (ip(10, 0, 0, 8), echo)]),
    );

    let responses = resolver(&transport)
        .resolve(&options(&[IPP]), None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(responses.is_empty());
}

#[tokio::test]
async fn silence_is_an_empty_result() {
    let transport = Arc::new(ReplayTransport::new().adapter(Vec::new()));

    let hosts = resolver(&transport)
        .resolve_hosts(&options(&[IPP]), None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(hosts.is_empty());
}

#[tokio::test]
async fn invalid_options_never_reach_the_network() {
    let transport = Arc::new(ReplayTransport::new());
    let too_long = format!("{}._tcp.local.", "x".repeat(70));

    let result = resolver(&transport)
        .resolve(&options(&[too_long.as_str()]), None, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ResolveError::InvalidOptions(_))));

    let label_at_limit = format!("{}._tcp.local.", "x".repeat(63));
    let result = resolver(&transport)
        .resolve(&options(&[label_at_limit.as_str()]), None, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ResolveError::InvalidOptions(_))));

    let result = resolver(&transport)
        .resolve(&options(&[]), None, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ResolveError::InvalidOptions(_))));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn cancelled_before_start_is_an_error() {
    let transport = Arc::new(ReplayTransport::new().adapter(vec![printer(5)]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = resolver(&transport).resolve(&options(&[IPP]), None, &cancel).await;

    assert!(matches!(result, Err(ResolveError::Cancelled)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn cancelled_mid_scan_returns_what_arrived() {
    let transport = Arc::new(
        ReplayTransport::new()
            .adapter(vec![printer(5)])
            .behavior(Behavior::WaitForCancel),
    );
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        })
    };

    let responses = resolver(&transport)
        .resolve(&options(&[IPP]), None, &cancel)
        .await
        .unwrap();
    canceller.await.unwrap();

    assert_eq!(responses.len(), 1);
    assert!(responses.contains_key(&ip(10, 0, 0, 5)));
}

#[tokio::test]
async fn cancelled_while_waiting_for_the_lock() {
    let holder = Arc::new(ReplayTransport::new().behavior(Behavior::WaitForCancel));
    let holder_cancel = CancellationToken::new();

    let first = {
        let resolver = resolver(&holder);
        let cancel = holder_cancel.clone();
        tokio::spawn(async move { resolver.resolve(&options(&[IPP]), None, &cancel).await })
    };

    while holder.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let waiter = Arc::new(ReplayTransport::new());
    let waiter_cancel = CancellationToken::new();
    let second = {
        let resolver = resolver(&waiter);
        let cancel = waiter_cancel.clone();
        tokio::spawn(async move { resolver.resolve(&options(&[IPP]), None, &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    waiter_cancel.cancel();

    assert!(matches!(second.await.unwrap(), Err(ResolveError::Cancelled)));
    assert_eq!(waiter.calls(), 0);

    holder_cancel.cancel();
    assert!(first.await.unwrap().unwrap().is_empty());
}

async fn run_pair(overlap: bool) -> usize {
    let transport = Arc::new(ReplayTransport::new().behavior(Behavior::Hold(Duration::from_millis(200))));
    let options = options(&[IPP]).with_overlap(overlap);

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let resolver = resolver(&transport);
            let options = options.clone();
            tokio::spawn(async move {
                resolver
                    .resolve(&options, None, &CancellationToken::new())
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(transport.calls(), 2);
    transport.max_in_flight()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resolutions_run_one_at_a_time_by_default() {
    assert_eq!(run_pair(false).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapped_resolutions_run_together() {
    assert_eq!(run_pair(true).await, 2);
}

#[tokio::test]
async fn transport_failures_surface_as_errors() {
    let transport = Arc::new(ReplayTransport::new().behavior(Behavior::Fail("adapter eth9 not found".to_string())));

    let result = resolver(&transport)
        .resolve(&options(&[IPP]), None, &CancellationToken::new())
        .await;

    match result {
        Err(ResolveError::Transport(e)) => assert!(e.to_string().contains("eth9")),
        other => panic!("expected a transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn responses_stream_while_scanning() {
    let (source, bytes) = printer(5);
    let transport = Arc::new(
        ReplayTransport::new().adapter(vec![(source, bytes.clone()), (source, bytes), printer(6)]),
    );

    let seen: Arc<Mutex<Vec<(IpAddr, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let callback: ResponseCallback = {
        let seen = seen.clone();
        Arc::new(move |source: IpAddr, response: &DnsResponse| {
            seen.lock().unwrap().push((source, response.answers.len()));
        })
    };

    resolver(&transport)
        .resolve(&options(&[IPP]), Some(callback), &CancellationToken::new())
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    let from_first: Vec<usize> = seen
        .iter()
        .filter(|(addr, _)| *addr == source)
        .map(|(_, answers)| *answers)
        .collect();
    assert_eq!(from_first, vec![1, 2]);
}

#[tokio::test]
async fn hosts_are_projected_and_filtered_by_protocol() {
    let web = (
        ip(10, 0, 0, 9),
        service_response(HTTP, "Web", "web.local.", Ipv4Addr::new(10, 0, 0, 9), 80),
    );
    let transport = Arc::new(ReplayTransport::new().adapter(vec![printer(6), web, printer(5)]));

    let streamed = Arc::new(AtomicUsize::new(0));
    let on_host: HostCallback = {
        let streamed = streamed.clone();
        Arc::new(move |host: &Host| {
            assert!(host.advertises(IPP));
            streamed.fetch_add(1, Ordering::SeqCst);
        })
    };

    let hosts = resolver(&transport)
        .resolve_hosts(&options(&["_IPP._tcp.local"]), Some(on_host), &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<&str> = hosts.iter().map(|host| host.id.as_str()).collect();
    assert_eq!(ids, vec!["10.0.0.5", "10.0.0.6"]);
    assert_eq!(streamed.load(Ordering::SeqCst), 2);

    let service = hosts[0].service("Printer-5._ipp._tcp.local.").unwrap();
    assert_eq!(service.port, 631);
    assert_eq!(service.protocol, IPP);
    assert_eq!(service.properties[0].get("txtvers"), Some(Some("1")));
}

#[tokio::test]
async fn browsing_groups_senders_by_service_type() {
    let transport = Arc::new(ReplayTransport::new().adapter(vec![
        (ip(10, 0, 0, 5), services_response(&[IPP, HTTP])),
        (ip(10, 0, 0, 6), services_response(&[HTTP])),
    ]));

    let domains = resolver(&transport)
        .browse_domains(&options(&[IPP]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(domains.len(), 2);
    assert_eq!(domains[HTTP].len(), 2);
    assert!(domains[IPP].contains(&ip(10, 0, 0, 5)));

    let sent = dns::decode(&transport.requests()[0].query).unwrap();
    assert!(!sent.header.is_response);
}
