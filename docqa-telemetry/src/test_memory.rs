use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, info_span};
use tracing_subscriber::layer::SubscriberExt;

use crate::memory::{QueryTraceLayer, QueryTraceStore};

fn subscriber(store: Arc<QueryTraceStore>) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::registry().with(QueryTraceLayer::new(store))
}

#[tokio::test]
async fn records_question_spans_with_inherited_query_id() {
    let store = Arc::new(QueryTraceStore::new());
    let _guard = tracing::subscriber::set_default(subscriber(store.clone()));

    async {
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        .instrument(info_span!("docqa.retrieve", top_k = 20u64))
        .await;
        tracing::info!("answered");
    }
    .instrument(info_span!("docqa.ask", query_id = "q-1", question_len = 18u64))
    .await;

    let spans = store.spans("q-1");
    let names: Vec<_> = spans.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["docqa.retrieve", "docqa.ask"]);
    assert_eq!(spans[0].attributes["top_k"], 20);
    assert!(!spans[0].attributes.contains_key("query_id"));
    assert!(spans[1].duration >= spans[0].duration);
    assert!(spans[0].duration >= Duration::from_millis(5));
}

#[test]
fn ignores_spans_without_query_id() {
    let store = Arc::new(QueryTraceStore::new());
    tracing::subscriber::with_default(subscriber(store.clone()), || {
        let span = info_span!("docqa.ingest", files = 3u64);
        let _entered = span.enter();
    });
    assert!(store.is_empty());
}

#[test]
fn take_drains_a_query() {
    let store = Arc::new(QueryTraceStore::new());
    tracing::subscriber::with_default(subscriber(store.clone()), || {
        let _entered = info_span!("docqa.ask", query_id = "q-2").entered();
    });

    assert_eq!(store.take("q-2").len(), 1);
    assert!(store.spans("q-2").is_empty());
}

#[test]
fn span_record_serializes_duration_in_millis() {
    let record = crate::memory::SpanRecord {
        name: "docqa.compose".into(),
        query_id: "q".into(),
        duration: Duration::from_millis(1500),
        attributes: Default::default(),
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["duration_ms"], 1500.0);
    assert!(json.get("duration").is_none());
}
