use crate::delivery::DeliveryService;
use crate::metrics;
use crate::presence::ConnectionId;
use crate::websocket::message_types::{ClientEvent, ServerEvent};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Register a new connection, announce the presence change, and replay any
/// deliveries that were waiting for this user.
pub async fn handle_connect(
    delivery: &DeliveryService,
    user_id: Uuid,
    connection_id: ConnectionId,
    sender: UnboundedSender<String>,
) {
    delivery
        .registry
        .register(user_id, connection_id, sender)
        .await;
    tracing::info!(%user_id, "user connected");

    broadcast_online_users(delivery).await;

    if let Err(e) = delivery.replay_pending(user_id).await {
        tracing::error!(%user_id, error = %e, "pending-delivery replay failed");
    }
}

/// Tear down a closed connection. A stale disconnect (the user already
/// reconnected with a newer handle) leaves all state untouched.
pub async fn handle_disconnect(
    delivery: &DeliveryService,
    user_id: Uuid,
    connection_id: ConnectionId,
) {
    if !delivery.registry.unregister(user_id, connection_id).await {
        return;
    }
    tracing::info!(%user_id, "user disconnected");

    // View state must not survive the session.
    delivery.tracker.leave(user_id).await;

    if let Err(e) = delivery.store.touch_last_seen(user_id).await {
        tracing::error!(%user_id, error = %e, "failed to persist last_seen");
    }

    broadcast_online_users(delivery).await;
}

/// Route one inbound event from `user_id`'s connection.
///
/// Handlers are idempotent with respect to missing targets: a routing miss
/// is a no-op, never an error surfaced to the caller. Persistence failures
/// are logged and abort only the transition they belong to.
pub async fn dispatch(delivery: &DeliveryService, user_id: Uuid, event: ClientEvent) {
    match event {
        ClientEvent::Typing { to_user_id } => {
            forward(delivery, to_user_id, ServerEvent::Typing { from: user_id }).await;
        }
        ClientEvent::StopTyping { to_user_id } => {
            forward(
                delivery,
                to_user_id,
                ServerEvent::StopTyping { from: user_id },
            )
            .await;
        }
        ClientEvent::CallUser { to, peer_id } => {
            forward(
                delivery,
                to,
                ServerEvent::IncomingCall {
                    from: user_id,
                    peer_id,
                },
            )
            .await;
        }
        ClientEvent::AcceptCall { to } => {
            forward(delivery, to, ServerEvent::CallAccepted).await;
        }
        ClientEvent::RejectCall { to } => {
            forward(delivery, to, ServerEvent::CallRejected).await;
        }
        ClientEvent::EndCall { to } => {
            // Echoed to the caller as well so both call UIs terminate even
            // when the callee never received the event.
            forward(delivery, to, ServerEvent::CallEnded).await;
            forward(delivery, user_id, ServerEvent::CallEnded).await;
        }
        ClientEvent::SendMessage { message } => {
            if let Err(e) = delivery.send_message(user_id, message).await {
                tracing::error!(%user_id, error = %e, "send-message failed");
            }
        }
        ClientEvent::ReadMessages { from_user_id } => {
            if let Err(e) = delivery.mark_conversation_read(user_id, from_user_id).await {
                tracing::error!(%user_id, error = %e, "read-messages failed");
            }
        }
        ClientEvent::JoinChat { peer_id } => {
            delivery.tracker.join(user_id, peer_id).await;
        }
        ClientEvent::LeaveChat => {
            delivery.tracker.leave(user_id).await;
        }
    }
}

async fn forward(delivery: &DeliveryService, to: Uuid, event: ServerEvent) {
    delivery.push(to, &event).await;
}

async fn broadcast_online_users(delivery: &DeliveryService) {
    let users = delivery.registry.online_users().await;
    metrics::CONNECTED_USERS.set(users.len() as i64);
    match (ServerEvent::OnlineUsers { users }).to_json() {
        Ok(payload) => delivery.registry.broadcast(&payload).await,
        Err(e) => tracing::error!(error = %e, "failed to serialize online-users snapshot"),
    }
}
