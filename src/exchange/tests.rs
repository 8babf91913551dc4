//! Unit tests for the reply correlation engine.

use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use rstest::{fixture, rstest};
use tracing_test::traced_test;

use super::*;
use crate::{
    client::ClientError,
    disconnect::DisconnectionReasonCode,
    reply::ReplyStatus,
    request::BoxError,
    test_helpers::{MemoryClient, TagCodec, TagFrame, encode_all},
};

const DEADLINE: Duration = Duration::from_millis(500);

struct Link {
    client: Arc<MemoryClient>,
    unpacker: Arc<Unpacker<TagCodec>>,
}

impl Link {
    fn assert_released(&self) {
        assert!(self.unpacker.frames().is_empty(), "frame listener leaked");
        assert!(self.client.disconnected().is_empty(), "disconnect listener leaked");
    }
}

#[fixture]
fn link() -> Link {
    let client = MemoryClient::shared();
    let unpacker = Unpacker::new(TagCodec::default());
    unpacker.bind(client.clone());
    Link { client, unpacker }
}

fn is_pong(_: &TagFrame, frame: &TagFrame) -> bool { frame.tag == "PONG" }

fn never(_: &TagFrame, _: &TagFrame) -> bool { false }

struct Unencodable;

impl Request for Unencodable {
    fn to_bytes(&self) -> Result<Bytes, BoxError> { Err("no wire form".into()) }
}

#[test]
fn unbound_unpacker_is_rejected_before_io() {
    let unpacker = Unpacker::new(TagCodec::default());
    let result = Exchange::new(TagFrame::tag("PING"), DEADLINE).wait(&unpacker);
    assert!(matches!(result, Err(ArgumentError::Unbound)));
    assert!(unpacker.frames().is_empty());
}

#[rstest]
fn first_frame_completes_without_matcher(link: Link) {
    link.client.respond_with(|_| {
        vec![encode_all(&[TagFrame::tag("FIRST"), TagFrame::tag("SECOND")])]
    });

    let reply = Exchange::new(TagFrame::tag("PING"), DEADLINE)
        .wait(&link.unpacker)
        .expect("bound");

    assert_eq!(reply.status(), ReplyStatus::Completed);
    assert_eq!(reply.into_value().map(|frame| frame.tag), Some("FIRST".into()));
    link.assert_released();
}

#[rstest]
fn unrelated_frames_are_skipped(link: Link) {
    link.client.respond_with(|_| {
        vec![encode_all(&[
            TagFrame::tag("STATUS"),
            TagFrame::new("PONG", Bytes::from_static(b"ok")),
        ])]
    });

    let started = Instant::now();
    let reply = send_and_wait(&link.unpacker, TagFrame::tag("PING"), DEADLINE, is_pong)
        .expect("bound");

    assert!(started.elapsed() < DEADLINE);
    let frame = reply.value().expect("completed");
    assert_eq!(frame.tag, "PONG");
    assert_eq!(frame.payload, Bytes::from_static(b"ok"));
    assert_eq!(link.client.sent(), [TagFrame::tag("PING").encode().expect("encode")]);
    link.assert_released();
}

#[rstest]
fn unmatched_exchange_times_out_after_deadline(link: Link) {
    let deadline = Duration::from_millis(30);
    link.client
        .respond_with(|_| vec![encode_all(&[TagFrame::tag("STATUS")])]);

    let started = Instant::now();
    let reply = send_and_wait(&link.unpacker, TagFrame::tag("PING"), deadline, never)
        .expect("bound");

    assert!(started.elapsed() >= deadline);
    assert_eq!(reply.status(), ReplyStatus::Timeout);
    assert!(reply.value().is_none());
    link.assert_released();
}

#[rstest]
fn disconnect_after_send_interrupts(link: Link) {
    let peer = Arc::downgrade(&link.client);
    link.client.respond_with(move |_| {
        if let Some(client) = peer.upgrade() {
            client.disconnect(DisconnectionReasonCode::Passive);
        }
        Vec::new()
    });

    let reply = send_and_wait(&link.unpacker, TagFrame::tag("PING"), DEADLINE, is_pong)
        .expect("bound");

    assert_eq!(reply.status(), ReplyStatus::Interrupted);
    assert!(!reply.client().is_connected());
    link.assert_released();
}

#[rstest]
fn disconnect_from_another_thread_interrupts(link: Link) {
    let client = Arc::clone(&link.client);
    let dropper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        client.disconnect(DisconnectionReasonCode::Error)
    });

    let reply = send_and_wait(&link.unpacker, TagFrame::tag("PING"), DEADLINE, is_pong)
        .expect("bound");

    assert!(dropper.join().expect("join"));
    assert_eq!(reply.status(), ReplyStatus::Interrupted);
    link.assert_released();
}

#[rstest]
fn captured_frame_wins_over_later_disconnect(link: Link) {
    // Registered after the unpacker's feed, so it runs once the frame has
    // already been delivered to the exchange.
    let peer = Arc::downgrade(&link.client);
    let _cut = link.client.data_received().subscribe(move |_| {
        if let Some(client) = peer.upgrade() {
            client.disconnect(DisconnectionReasonCode::Passive);
        }
    });
    link.client
        .respond_with(|_| vec![encode_all(&[TagFrame::tag("PONG")])]);

    let reply = send_and_wait(&link.unpacker, TagFrame::tag("PING"), DEADLINE, is_pong)
        .expect("bound");

    assert_eq!(reply.status(), ReplyStatus::Completed);
    assert!(!link.client.is_connected());
    link.assert_released();
}

#[rstest]
fn resolved_reply_ignores_later_traffic(link: Link) {
    link.client
        .respond_with(|_| vec![encode_all(&[TagFrame::new("PONG", Bytes::from_static(b"1"))])]);
    let reply = send_and_wait(&link.unpacker, TagFrame::tag("PING"), DEADLINE, is_pong)
        .expect("bound");

    link.client
        .inject(encode_all(&[TagFrame::new("PONG", Bytes::from_static(b"2"))]));
    link.client.disconnect(DisconnectionReasonCode::Active);

    assert_eq!(reply.status(), ReplyStatus::Completed);
    assert_eq!(
        reply.value().map(|frame| frame.payload.clone()),
        Some(Bytes::from_static(b"1"))
    );
    link.assert_released();
}

#[rstest]
fn send_failure_resolves_error(link: Link) {
    link.client.fail_sends(true);

    let reply = send_and_wait(&link.unpacker, TagFrame::tag("PING"), DEADLINE, is_pong)
        .expect("bound");

    assert_eq!(reply.status(), ReplyStatus::Error);
    assert!(matches!(
        reply.error(),
        Some(ReplyError::Send(ClientError::Io(_)))
    ));
    link.assert_released();
}

#[rstest]
fn sending_on_dropped_link_resolves_error(link: Link) {
    link.client.disconnect(DisconnectionReasonCode::Timeout);

    let reply = send_and_wait(&link.unpacker, TagFrame::tag("PING"), DEADLINE, is_pong)
        .expect("bound");

    assert!(matches!(
        reply.error(),
        Some(ReplyError::Send(ClientError::NotConnected))
    ));
    link.assert_released();
}

#[rstest]
fn serialization_failure_sends_nothing(link: Link) {
    let reply = Exchange::new(Unencodable, DEADLINE)
        .wait(&link.unpacker)
        .expect("bound");

    assert_eq!(reply.status(), ReplyStatus::Error);
    assert!(matches!(reply.error(), Some(ReplyError::Serialize(_))));
    assert!(link.client.sent().is_empty());
    link.assert_released();
}

#[rstest]
fn send_options_reach_transport(link: Link) {
    let target: SocketAddr = "127.0.0.1:5020".parse().expect("address");
    let options = SendOptions::default().flush(false).target(target);

    let _ = Exchange::new(TagFrame::tag("PING"), Duration::from_millis(1))
        .send_options(options)
        .wait(&link.unpacker)
        .expect("bound");

    assert_eq!(link.client.sent_options(), [options]);
}

#[test]
fn raw_exchange_matches_chunks() {
    let client = MemoryClient::shared();
    client.respond_with(|_| {
        vec![
            Bytes::from_static(b"noise"),
            Bytes::from_static(b"OK 1"),
            Bytes::from_static(b"OK 2"),
        ]
    });

    let reply = Exchange::new(Bytes::from_static(b"GET"), DEADLINE)
        .matching(|_: &Bytes, chunk: &DataReceived| chunk.data().starts_with(b"OK"))
        .wait_raw(Arc::clone(&client) as Arc<dyn BytesClient>);

    assert_eq!(
        reply.value().map(DataReceived::data),
        Some(&Bytes::from_static(b"OK 1"))
    );
    assert!(client.data_received().is_empty());
    assert!(client.disconnected().is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn async_exchange_times_out_at_deadline(link: Link) {
    let deadline = Duration::from_millis(100);
    let started = tokio::time::Instant::now();

    let reply = send_and_wait_async(&link.unpacker, TagFrame::tag("PING"), deadline, never)
        .await
        .expect("bound");

    let elapsed = started.elapsed();
    assert_eq!(reply.status(), ReplyStatus::Timeout);
    assert!(elapsed >= deadline);
    assert!(elapsed < deadline + Duration::from_millis(5));
    link.assert_released();
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn async_exchange_sees_late_reply(link: Link) {
    let client = Arc::clone(&link.client);
    let pending = tokio::spawn({
        let unpacker = Arc::clone(&link.unpacker);
        async move {
            Exchange::new(TagFrame::tag("PING"), DEADLINE)
                .matching(is_pong)
                .wait_async(&unpacker)
                .await
        }
    });
    while client.sent().is_empty() {
        tokio::task::yield_now().await;
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    client.inject(encode_all(&[TagFrame::tag("STATUS"), TagFrame::tag("PONG")]));

    let reply = pending.await.expect("join").expect("bound");
    assert_eq!(reply.value().map(|frame| frame.tag.as_str()), Some("PONG"));
    link.assert_released();
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn concurrent_exchanges_resolve_independently(link: Link) {
    let spawn_for = |id: &'static [u8]| {
        let unpacker = Arc::clone(&link.unpacker);
        tokio::spawn(async move {
            Exchange::new(TagFrame::new("GET", Bytes::from_static(id)), DEADLINE)
                .matching(|request: &TagFrame, frame: &TagFrame| request.payload == frame.payload)
                .wait_async(&unpacker)
                .await
        })
    };
    let first = spawn_for(b"1");
    let second = spawn_for(b"2");
    while link.client.sent().len() < 2 {
        tokio::task::yield_now().await;
    }

    link.client.inject(encode_all(&[
        TagFrame::new("VAL", Bytes::from_static(b"2")),
        TagFrame::new("VAL", Bytes::from_static(b"1")),
    ]));

    let first = first.await.expect("join").expect("bound");
    let second = second.await.expect("join").expect("bound");
    assert_eq!(
        first.value().map(|frame| frame.payload.clone()),
        Some(Bytes::from_static(b"1"))
    );
    assert_eq!(
        second.value().map(|frame| frame.payload.clone()),
        Some(Bytes::from_static(b"2"))
    );
    link.assert_released();
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn dropping_async_exchange_releases_listeners(link: Link) {
    let wait = Exchange::new(TagFrame::tag("PING"), DEADLINE).wait_async(&link.unpacker);
    let abandoned = tokio::time::timeout(Duration::from_millis(10), wait).await;

    assert!(abandoned.is_err());
    assert_eq!(link.client.sent().len(), 1);
    link.assert_released();
}

#[rstest]
#[tokio::test]
async fn async_raw_exchange_completes() {
    let client = MemoryClient::shared();
    client.respond_with(|request| vec![request.clone()]);

    let reply = Exchange::new(Bytes::from_static(b"echo"), DEADLINE)
        .wait_raw_async(Arc::clone(&client) as Arc<dyn BytesClient>)
        .await;

    assert_eq!(
        reply.into_value().map(|chunk| chunk.data().clone()),
        Some(Bytes::from_static(b"echo"))
    );
}

#[rstest]
#[traced_test]
fn timeout_is_logged(link: Link) {
    let reply = send_and_wait(
        &link.unpacker,
        TagFrame::tag("PING"),
        Duration::from_millis(5),
        never,
    )
    .expect("bound");

    assert_eq!(reply.status(), ReplyStatus::Timeout);
    assert!(logs_contain("exchange timed out"));
}

#[rstest]
#[traced_test]
fn interruption_is_logged_with_reason(link: Link) {
    let peer = Arc::downgrade(&link.client);
    link.client.respond_with(move |_| {
        if let Some(client) = peer.upgrade() {
            client.disconnect(DisconnectionReasonCode::Error);
        }
        Vec::new()
    });

    let _ = send_and_wait(&link.unpacker, TagFrame::tag("PING"), DEADLINE, is_pong);
    assert!(logs_contain("exchange interrupted by disconnect"));
    assert!(logs_contain("reason=error"));
}
