//! Ping handler for liveness checks
//!
//! Replies to `entrega.ping` so deploy tooling can verify the worker is
//! connected and reading its subjects.

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::types::ErrorResponse;

#[derive(Debug, Serialize, Deserialize)]
struct PingRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PongResponse {
    message: String,
    service: String,
    timestamp: String,
}

/// Handle ping messages
pub async fn handle_ping(client: Client, mut subscriber: Subscriber) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                error!("Ping message without reply subject");
                continue;
            }
        };

        // An empty payload is a valid ping
        let request: PingRequest = if msg.payload.is_empty() {
            PingRequest { message: None }
        } else {
            match serde_json::from_slice(&msg.payload) {
                Ok(req) => req,
                Err(e) => {
                    error!("Failed to parse ping request: {}", e);
                    let error = ErrorResponse::new(
                        Uuid::nil(),
                        "INVALID_REQUEST",
                        format!("Failed to parse request: {}", e),
                    );
                    let _ = client
                        .publish(reply, serde_json::to_vec(&error)?.into())
                        .await;
                    continue;
                }
            }
        };

        let response = PongResponse {
            message: match request.message {
                Some(m) => format!("Pong: {}", m),
                None => "Pong".to_string(),
            },
            service: env!("CARGO_PKG_NAME").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        client
            .publish(reply, serde_json::to_vec(&response)?.into())
            .await?;

        debug!("Answered ping");
    }

    Ok(())
}
