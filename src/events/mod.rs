//! Audit trail for administrative graph mutations.
//!
//! Handlers publish events on a broadcast bus; a single listener task
//! persists them to `audit_log`, chaining each row to the previous one with
//! `sha256(prev_hash || payload)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod loggable;
pub use loggable::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    /// External id of the acting principal
    pub actor: Option<String>,
    pub subject_id: Option<i64>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(name: String, actor: Option<String>, subject_id: Option<i64>, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            occurred_at: Utc::now(),
            actor,
            subject_id,
            payload,
        }
    }
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(1024)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPayload {
    #[serde(rename = "new")]
    pub current: Value,
    pub severity: Severity,
}

/// Publish `<entity>.<action>` for an entity. Failures are dropped; the audit
/// trail never fails a request.
pub fn log_activity<T: Loggable>(
    event_bus: &EventBus,
    action: &str,
    actor: Option<&str>,
    entity: &T,
) {
    let name = format!("{}.{}", T::entity_type(), action);
    let payload = AuditPayload {
        current: serde_json::to_value(entity).unwrap_or_default(),
        severity: entity.severity_for_action(action),
    };

    let event = DomainEvent::new(
        name,
        actor.map(str::to_string),
        Some(entity.subject_id()),
        serde_json::to_value(&payload).unwrap_or_default(),
    );

    let _ = event_bus.send(serde_json::to_value(event).unwrap_or_default());
}

/// Chain hash for one audit row.
pub fn chain_hash(prev_hash: Option<&str>, payload: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

pub async fn start_audit_listener(mut rx: broadcast::Receiver<Value>, pool: SqlitePool) {
    tracing::info!("audit listener started");
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "audit listener lagged, events dropped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Err(e) = persist_event(&pool, &event).await {
            tracing::error!("failed to write audit log: {}", e);
        }
    }
    tracing::info!("audit listener stopped");
}

async fn persist_event(pool: &SqlitePool, event: &Value) -> Result<(), sqlx::Error> {
    let name = event.get("name").and_then(Value::as_str).unwrap_or("unknown");
    let actor = event.get("actor").and_then(Value::as_str);
    let subject_id = event.get("subject_id").and_then(Value::as_i64);
    let occurred_at = event
        .get("occurred_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let severity = event
        .get("payload")
        .and_then(|p| p.get("severity"))
        .and_then(Value::as_str)
        .unwrap_or("important");
    let payload = serde_json::to_string(event).unwrap_or_default();

    let mut tx = pool.begin().await?;

    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT hash FROM audit_log ORDER BY rowid DESC LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
    let hash = chain_hash(prev_hash.as_deref(), &payload);

    sqlx::query(
        r#"
        INSERT INTO audit_log (id, event_name, actor, subject_id, occurred_at, payload, severity, prev_hash, hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(actor)
    .bind(subject_id)
    .bind(occurred_at)
    .bind(&payload)
    .bind(severity)
    .bind(&prev_hash)
    .bind(&hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_hash_depends_on_previous() {
        let first = chain_hash(None, "{\"a\":1}");
        let second = chain_hash(Some(&first), "{\"a\":1}");
        assert_ne!(first, second);
        assert_eq!(first.len(), 64);
        assert_eq!(first, chain_hash(None, "{\"a\":1}"));
    }

    #[test]
    fn test_log_activity_publishes_named_event() {
        #[derive(Serialize)]
        struct Thing {
            id: i64,
        }
        impl Loggable for Thing {
            fn entity_type() -> &'static str { "thing" }
            fn subject_id(&self) -> i64 { self.id }
        }

        let (bus, mut rx) = init_event_bus();
        log_activity(&bus, "deleted", Some("ada@example.com"), &Thing { id: 3 });

        let event = rx.try_recv().unwrap();
        assert_eq!(event["name"], "thing.deleted");
        assert_eq!(event["actor"], "ada@example.com");
        assert_eq!(event["subject_id"], 3);
        assert_eq!(event["payload"]["severity"], "critical");
    }
}
