pub mod message;

pub use message::{DeliveryStatus, Message, MessageKind, NewMessage};
