use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use envelope::{EnvelopeType, EventAck, Headers};
use tokio::sync::mpsc;

use super::*;

fn callback_envelope(topic: &str) -> DownstreamEnvelope {
    DownstreamEnvelope {
        spec_version: "1.0".into(),
        kind: EnvelopeType::Callback,
        headers: Headers { topic: topic.into(), message_id: "m-1".into(), ..Headers::default() },
        data: "{}".into(),
    }
}

fn noop() -> Box<dyn CallbackHandler> {
    Box::new(|_env: DownstreamEnvelope, _replier: Replier| async {})
}

#[test]
fn bind_rejects_empty_topic() {
    let mut registry = CallbackRegistry::new();
    let err = registry.bind("", noop()).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
    assert!(registry.is_empty());
}

#[test]
fn bind_rejects_duplicate_topic_and_keeps_first() {
    let mut registry = CallbackRegistry::new();
    registry.bind("/robot", noop()).unwrap();
    let err = registry.bind("/robot", noop()).unwrap_err();
    assert!(matches!(err, ClientError::DuplicateTopic { ref topic } if topic == "/robot"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn lookup_is_exact_match() {
    let mut registry = CallbackRegistry::new();
    registry.bind("/v1.0/im/bot/messages/get", noop()).unwrap();
    assert!(registry.callback("/v1.0/im/bot/messages/get").is_some());
    assert!(registry.callback("/v1.0/im/bot/messages").is_none());
    assert!(registry.callback("/V1.0/IM/BOT/MESSAGES/GET").is_none());
}

#[tokio::test]
async fn closure_callback_is_invoked_with_envelope() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let mut registry = CallbackRegistry::new();
    registry
        .bind(
            "/robot",
            Box::new(move |env: DownstreamEnvelope, _replier: Replier| {
                let counter = counter.clone();
                async move {
                    assert_eq!(env.topic(), "/robot");
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        )
        .unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let handler = registry.callback("/robot").unwrap();
    handler.on_callback(callback_envelope("/robot"), Replier::new(tx)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn catch_all_is_last_write_wins() {
    let mut registry = CallbackRegistry::new();
    assert!(registry.catch_all().is_none());

    registry.set_catch_all(Box::new(|_env: DownstreamEnvelope| async { EventAckData::success() }));
    registry.set_catch_all(Box::new(|_env: DownstreamEnvelope| async { EventAckData::later("busy") }));

    let ack = registry.catch_all().unwrap().on_event(callback_envelope("evt")).await;
    assert_eq!(ack.status, EventAck::Later);
    assert_eq!(ack.message.as_deref(), Some("busy"));
}

struct Recorder {
    seen: Arc<AtomicUsize>,
}

#[async_trait]
impl EventHandler for Recorder {
    async fn on_event(&self, _envelope: DownstreamEnvelope) -> EventAckData {
        self.seen.fetch_add(1, Ordering::SeqCst);
        EventAckData::success()
    }
}

#[tokio::test]
async fn struct_handlers_implement_the_trait_directly() {
    let seen = Arc::new(AtomicUsize::new(0));
    let mut registry = CallbackRegistry::new();
    registry.set_catch_all(Box::new(Recorder { seen: seen.clone() }));
    registry.catch_all().unwrap().on_event(callback_envelope("evt")).await;
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
