use crate::models::{DeliveryStatus, Message, NewMessage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events a client may send over its WebSocket.
///
/// The acting user is always taken from the connection itself, never from
/// the payload, so one client cannot speak for another.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "typing")]
    Typing { to_user_id: Uuid },
    #[serde(rename = "stop-typing")]
    StopTyping { to_user_id: Uuid },
    #[serde(rename = "call-user")]
    CallUser { to: Uuid, peer_id: String },
    #[serde(rename = "accept-call")]
    AcceptCall { to: Uuid },
    #[serde(rename = "reject-call")]
    RejectCall { to: Uuid },
    #[serde(rename = "end-call")]
    EndCall { to: Uuid },
    #[serde(rename = "send-message")]
    SendMessage { message: NewMessage },
    #[serde(rename = "read-messages")]
    ReadMessages { from_user_id: Uuid },
    #[serde(rename = "join-chat")]
    JoinChat { peer_id: Uuid },
    #[serde(rename = "leave-chat")]
    LeaveChat,
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "online-users")]
    OnlineUsers { users: Vec<Uuid> },
    #[serde(rename = "typing")]
    Typing { from: Uuid },
    #[serde(rename = "stop-typing")]
    StopTyping { from: Uuid },
    #[serde(rename = "incoming-call")]
    IncomingCall { from: Uuid, peer_id: String },
    #[serde(rename = "call-accepted")]
    CallAccepted,
    #[serde(rename = "call-rejected")]
    CallRejected,
    #[serde(rename = "call-ended")]
    CallEnded,
    #[serde(rename = "receive-message")]
    ReceiveMessage { message: Message },
    #[serde(rename = "message-status")]
    MessageStatus {
        message_id: Uuid,
        status: DeliveryStatus,
    },
    #[serde(rename = "messages-read")]
    MessagesRead { reader_id: Uuid },
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_parse_from_tagged_json() {
        let to = Uuid::new_v4();
        let raw = format!(r#"{{"type":"typing","to_user_id":"{to}"}}"#);
        match serde_json::from_str::<ClientEvent>(&raw).unwrap() {
            ClientEvent::Typing { to_user_id } => assert_eq!(to_user_id, to),
            other => panic!("unexpected event: {other:?}"),
        }

        let receiver = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"send-message","message":{{"receiver_id":"{receiver}","content":"hey"}}}}"#
        );
        match serde_json::from_str::<ClientEvent>(&raw).unwrap() {
            ClientEvent::SendMessage { message } => {
                assert_eq!(message.receiver_id, receiver);
                assert_eq!(message.content.as_deref(), Some("hey"));
                assert!(message.image_url.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let raw = r#"{"type":"leave-chat"}"#;
        assert!(matches!(
            serde_json::from_str::<ClientEvent>(raw).unwrap(),
            ClientEvent::LeaveChat
        ));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let raw = r#"{"type":"shutdown-server"}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn server_events_carry_their_type_tag() {
        let event = ServerEvent::MessageStatus {
            message_id: Uuid::new_v4(),
            status: DeliveryStatus::Delivered,
        };
        let value: serde_json::Value =
            serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "message-status");
        assert_eq!(value["status"], "delivered");

        let value: serde_json::Value =
            serde_json::from_str(&ServerEvent::CallEnded.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "call-ended");
    }
}
