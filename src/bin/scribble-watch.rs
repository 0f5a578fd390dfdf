//! Headless observer: joins a room and keeps a `CanvasReplica` in sync.
//!
//! Painting is logged instead of rendered, which makes this useful for
//! watching a room from a terminal or smoke-testing a deployment.

use clap::Parser;
use futures::{SinkExt, StreamExt};
use scribble::client::{CanvasReplica, SegmentStyle, Surface};
use scribble::protocol::{self, Point, ServerEvent};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error, Message};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum WatchError {
    #[error("websocket error: {0}")]
    Ws(Box<Error>),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<Error> for WatchError {
    fn from(error: Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

#[derive(Parser, Debug)]
#[command(name = "scribble-watch", about = "Follow a scribble room from the terminal")]
struct Cli {
    #[arg(long, env = "SCRIBBLE_URL", default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    #[arg(long, env = "SCRIBBLE_ROOM", default_value = "default")]
    room: String,
}

/// Surface that reports paint calls through tracing.
#[derive(Debug, Default)]
struct TracingSurface {
    segments: u64,
}

impl Surface for TracingSurface {
    fn clear(&mut self) {
        tracing::debug!(painted = self.segments, "surface cleared");
        self.segments = 0;
    }

    fn draw_segment(&mut self, from: Point, to: Point, style: &SegmentStyle<'_>) {
        self.segments += 1;
        tracing::trace!(
            from.x = from.x,
            from.y = from.y,
            to.x = to.x,
            to.y = to.y,
            color = style.color,
            width = style.width,
            blend = ?style.blend,
            "segment"
        );
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scribble_watch=info,scribble=info")),
        )
        .init();

    let cli = Cli::parse();
    tokio::select! {
        result = watch(&cli) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "watch failed");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
        }
    }
}

async fn watch(cli: &Cli) -> Result<(), WatchError> {
    let (mut stream, _) = connect_async(cli.url.as_str()).await?;
    tracing::info!(url = %cli.url, room = %cli.room, "connected");

    let mut replica = CanvasReplica::new(TracingSurface::default());
    let join = protocol::encode(&replica.join(&cli.room))?;
    stream.send(Message::Text(join.into())).await?;

    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(Error::ConnectionClosed | Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => break,
            Err(e) => return Err(e.into()),
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => {
                tracing::info!("server closed the connection");
                return Ok(());
            }
            _ => continue,
        };
        let event: ServerEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring undecodable event");
                continue;
            }
        };
        report(&replica, &event);
        if replica.apply(event) {
            tracing::info!(
                room = replica.room_id().unwrap_or("?"),
                operations = replica.operations().len(),
                users = replica.users().count(),
                "canvas updated"
            );
        }
    }

    tracing::info!("connection ended");
    Ok(())
}

fn report(replica: &CanvasReplica<TracingSurface>, event: &ServerEvent) {
    match event {
        ServerEvent::InitSnapshot(snapshot) => {
            tracing::info!(
                room = %snapshot.room_id,
                name = %snapshot.user_name,
                operations = snapshot.operations.len(),
                users = snapshot.users.len(),
                "joined"
            );
        }
        ServerEvent::UserJoined(user) => tracing::info!(name = %user.name, "user joined"),
        ServerEvent::UserLeft(departure) => {
            let name = replica.user(&departure.user_id).map_or("unknown", |u| u.name.as_str());
            tracing::info!(name, "user left");
        }
        ServerEvent::Error(err) => tracing::warn!(code = %err.code, message = %err.message, "server error"),
        other if other.is_chatty() => tracing::debug!(event = other.name(), "fragment"),
        other => tracing::debug!(event = other.name(), "event"),
    }
}
