//! In-memory capture of per-question spans.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::span::{Attributes, Id, Record};
use tracing::{Subscriber, field::Field};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Span field that groups spans into one question.
pub const QUERY_ID_FIELD: &str = "query_id";

/// A closed span belonging to one question.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub name: String,
    pub query_id: String,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    pub attributes: HashMap<String, serde_json::Value>,
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Spans recorded per query id, in closing order.
#[derive(Debug, Default)]
pub struct QueryTraceStore {
    traces: RwLock<HashMap<String, Vec<SpanRecord>>>,
}

impl QueryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spans recorded so far for `query_id`.
    pub fn spans(&self, query_id: &str) -> Vec<SpanRecord> {
        self.traces.read().ok().and_then(|t| t.get(query_id).cloned()).unwrap_or_default()
    }

    /// Remove and return the spans for `query_id`.
    pub fn take(&self, query_id: &str) -> Vec<SpanRecord> {
        self.traces.write().ok().and_then(|mut t| t.remove(query_id)).unwrap_or_default()
    }

    /// Whether no spans have been recorded.
    pub fn is_empty(&self) -> bool {
        self.traces.read().map(|t| t.is_empty()).unwrap_or(true)
    }

    fn push(&self, record: SpanRecord) {
        if let Ok(mut traces) = self.traces.write() {
            traces.entry(record.query_id.clone()).or_default().push(record);
        }
    }
}

/// A tracing layer that records spans carrying a `query_id`, directly or
/// inherited from a parent span.
pub struct QueryTraceLayer {
    store: Arc<QueryTraceStore>,
}

impl QueryTraceLayer {
    pub fn new(store: Arc<QueryTraceStore>) -> Self {
        Self { store }
    }
}

struct SpanStart(Instant);

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

impl<S> Layer<S> for QueryTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        if !fields.contains_key(QUERY_ID_FIELD) {
            let inherited = span.parent().and_then(|parent| {
                parent.extensions().get::<SpanFields>().and_then(|f| f.0.get(QUERY_ID_FIELD).cloned())
            });
            if let Some(query_id) = inherited {
                fields.insert(QUERY_ID_FIELD.to_string(), query_id);
            }
        }

        let mut extensions = span.extensions_mut();
        extensions.insert(SpanStart(Instant::now()));
        extensions.insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let extensions = span.extensions();

        let Some(fields) = extensions.get::<SpanFields>() else { return };
        let Some(query_id) = fields.0.get(QUERY_ID_FIELD).and_then(|v| v.as_str()) else { return };
        let duration = extensions.get::<SpanStart>().map(|s| s.0.elapsed()).unwrap_or_default();

        let mut attributes = fields.0.clone();
        attributes.remove(QUERY_ID_FIELD);
        self.store.push(SpanRecord {
            name: span.metadata().name().to_string(),
            query_id: query_id.to_string(),
            duration,
            attributes,
        });
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
