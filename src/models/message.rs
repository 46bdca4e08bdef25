use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery lifecycle of a message.
///
/// The lifecycle only moves forward: sent -> delivered -> read. The store
/// layer enforces this with conditional updates; `can_advance_to` is the
/// in-process form of the same rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[sqlx(rename = "sent")]
    Sent,
    #[sqlx(rename = "delivered")]
    Delivered,
    #[sqlx(rename = "read")]
    Read,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Sent => 0,
            Self::Delivered => 1,
            Self::Read => 2,
        }
    }

    /// True when moving to `next` does not regress the lifecycle.
    pub fn can_advance_to(self, next: DeliveryStatus) -> bool {
        next.rank() > self.rank()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[sqlx(rename = "text")]
    Text,
    #[sqlx(rename = "image")]
    Image,
    #[sqlx(rename = "audio")]
    Audio,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

/// Message row as stored and as pushed over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub kind: MessageKind,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Client-supplied fields of a new message. Id, sender, status and
/// timestamps are stamped server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub receiver_id: Uuid,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

impl NewMessage {
    /// The kind is derived from which payload fields are present, media
    /// references taking precedence over text.
    pub fn kind(&self) -> MessageKind {
        if self.audio_url.is_some() {
            MessageKind::Audio
        } else if self.image_url.is_some() {
            MessageKind::Image
        } else {
            MessageKind::Text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_advances_forward() {
        assert!(DeliveryStatus::Sent.can_advance_to(DeliveryStatus::Delivered));
        assert!(DeliveryStatus::Sent.can_advance_to(DeliveryStatus::Read));
        assert!(DeliveryStatus::Delivered.can_advance_to(DeliveryStatus::Read));

        assert!(!DeliveryStatus::Delivered.can_advance_to(DeliveryStatus::Sent));
        assert!(!DeliveryStatus::Read.can_advance_to(DeliveryStatus::Delivered));
        assert!(!DeliveryStatus::Read.can_advance_to(DeliveryStatus::Sent));
        assert!(!DeliveryStatus::Sent.can_advance_to(DeliveryStatus::Sent));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::Delivered).unwrap(),
            "\"delivered\""
        );
        let parsed: DeliveryStatus = serde_json::from_str("\"read\"").unwrap();
        assert_eq!(parsed, DeliveryStatus::Read);
    }

    #[test]
    fn kind_derived_from_payload_fields() {
        let text = NewMessage {
            receiver_id: Uuid::new_v4(),
            content: Some("hello".into()),
            image_url: None,
            audio_url: None,
        };
        assert_eq!(text.kind(), MessageKind::Text);

        let image = NewMessage {
            receiver_id: Uuid::new_v4(),
            content: None,
            image_url: Some("https://cdn.example.com/pic.jpg".into()),
            audio_url: None,
        };
        assert_eq!(image.kind(), MessageKind::Image);

        let audio = NewMessage {
            receiver_id: Uuid::new_v4(),
            content: None,
            image_url: None,
            audio_url: Some("https://cdn.example.com/clip.ogg".into()),
        };
        assert_eq!(audio.kind(), MessageKind::Audio);
    }
}
