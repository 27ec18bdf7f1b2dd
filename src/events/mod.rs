/// Durable event log with live fan-out
///
/// Every published event is appended to an ordered log before being fanned
/// out to in-process subscribers. Viewers resume from a cursor, so nothing is
/// lost across restarts and additional instances can serve the same log.
use crate::error::{AppError, AppResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;

/// Event kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    News,
    Agenda,
    Document,
    Member,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::News => "news",
            EventKind::Agenda => "agenda",
            EventKind::Document => "document",
            EventKind::Member => "member",
        }
    }
}

/// Event as delivered to stream subscribers
#[derive(Debug, Clone, Serialize)]
pub struct StreamEvent {
    pub seq: i64,
    pub kind: String,
    pub payload: serde_json::Value,
    pub time: String,
}

/// Broadcaster configuration
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Maximum number of events returned in a single replay query
    pub max_replay: i64,
    /// In-process fan-out channel capacity
    pub channel_capacity: usize,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            max_replay: 500,
            channel_capacity: 1024,
        }
    }
}

/// Event broadcaster - durable log plus live channel
#[derive(Clone)]
pub struct Broadcaster {
    db: SqlitePool,
    config: BroadcasterConfig,
    tx: broadcast::Sender<StreamEvent>,
}

impl Broadcaster {
    pub fn new(db: SqlitePool, config: BroadcasterConfig) -> Self {
        let (tx, _) = broadcast::channel(config.channel_capacity);
        Self { db, config, tx }
    }

    /// Append an event to the log and fan it out to live subscribers
    pub async fn publish(&self, kind: EventKind, payload: serde_json::Value) -> AppResult<i64> {
        let now = Utc::now().to_rfc3339();
        let encoded = serde_json::to_string(&payload)
            .map_err(|e| AppError::Internal(format!("Failed to encode event: {}", e)))?;

        let row = sqlx::query(
            r#"
            INSERT INTO event_log (kind, payload, created_at)
            VALUES (?1, ?2, ?3)
            RETURNING seq
            "#,
        )
        .bind(kind.as_str())
        .bind(&encoded)
        .bind(&now)
        .fetch_one(&self.db)
        .await?;

        let seq: i64 = row.try_get("seq")?;

        crate::metrics::EVENTS_PUBLISHED_TOTAL.inc();

        // No live subscribers is fine; the log is the source of truth
        let _ = self.tx.send(StreamEvent {
            seq,
            kind: kind.as_str().to_string(),
            payload,
            time: now,
        });

        Ok(seq)
    }

    /// Events after the cursor, oldest first
    pub async fn replay_since(&self, cursor: i64) -> AppResult<Vec<StreamEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT seq, kind, payload, created_at
            FROM event_log
            WHERE seq > ?1
            ORDER BY seq ASC
            LIMIT ?2
            "#,
        )
        .bind(cursor)
        .bind(self.config.max_replay)
        .fetch_all(&self.db)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let payload_str: String = row.try_get("payload")?;
            let payload = serde_json::from_str(&payload_str)
                .map_err(|e| AppError::Internal(format!("Failed to decode event: {}", e)))?;

            events.push(StreamEvent {
                seq: row.try_get("seq")?,
                kind: row.try_get("kind")?,
                payload,
                time: row.try_get("created_at")?,
            });
        }

        Ok(events)
    }

    /// Current maximum sequence number
    pub async fn current_seq(&self) -> AppResult<Option<i64>> {
        let row = sqlx::query("SELECT MAX(seq) as max_seq FROM event_log")
            .fetch_one(&self.db)
            .await?;

        Ok(row.try_get("max_seq").ok())
    }

    /// Subscribe to live events
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.tx.subscribe()
    }
}
