/// Server-push event stream
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;

/// Build stream routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/events/stream", get(event_stream))
}

#[derive(Debug, Deserialize)]
struct CursorQuery {
    cursor: Option<i64>,
}

/// Subscribe to the event stream.
///
/// Replays durable events after the given cursor, then continues with live
/// fan-out. Clients resume after a disconnect by passing the last sequence
/// number they saw.
async fn event_stream(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Query(query): Query<CursorQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    // Subscribe before replaying so no event can fall between the two
    let live = BroadcastStream::new(ctx.broadcaster.subscribe())
        .filter_map(|result| async move { result.ok() });

    let cursor = query.cursor.unwrap_or(0);
    let replay = ctx.broadcaster.replay_since(cursor).await?;

    let stream = stream::iter(replay)
        .chain(live)
        .map(|event| {
            Event::default()
                .id(event.seq.to_string())
                .event(event.kind.clone())
                .json_data(&event)
        });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
