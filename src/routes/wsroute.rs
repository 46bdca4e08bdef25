use crate::state::AppState;
use crate::websocket::session::WsSession;
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: Uuid,
}

/// Upgrade to a realtime session. The connection is keyed by the `user_id`
/// query parameter; authentication happens upstream of this service.
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let params = query.into_inner();

    let session = WsSession::new(
        params.user_id,
        state.delivery.clone(),
        Duration::from_secs(state.config.heartbeat_interval_secs),
        Duration::from_secs(state.config.client_timeout_secs),
    );

    ws::start(session, &req, stream)
}

#[get("/metrics")]
pub async fn metrics_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(crate::metrics::render())
}
