use crate::{config::Config, delivery::DeliveryService};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub delivery: DeliveryService,
    pub config: Arc<Config>,
}
