pub mod message_types;
pub mod router;
pub mod session;
