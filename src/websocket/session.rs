use crate::delivery::DeliveryService;
use crate::presence::ConnectionId;
use crate::websocket::message_types::ClientEvent;
use crate::websocket::router;
use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use uuid::Uuid;

/// Frame pushed from the registry channel into the actor mailbox.
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct OutboundFrame(String);

/// One WebSocket session for one user.
///
/// The session owns its connection id; presence registration happens when
/// the actor starts and is undone, unless superseded, when it stops.
/// Inbound frames are funneled through a single worker task so events from
/// this connection are handled strictly in arrival order even though the
/// handlers themselves await persistence calls.
pub struct WsSession {
    user_id: Uuid,
    connection_id: ConnectionId,
    delivery: DeliveryService,
    events: Option<UnboundedSender<ClientEvent>>,
    hb: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl WsSession {
    pub fn new(
        user_id: Uuid,
        delivery: DeliveryService,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            user_id,
            connection_id: ConnectionId::new(),
            delivery,
            events: None,
            hb: Instant::now(),
            heartbeat_interval,
            client_timeout,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.client_timeout;
        ctx.run_interval(self.heartbeat_interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                tracing::warn!(user_id = %act.user_id, "heartbeat timed out, closing session");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        // Bridge the registry channel into the actor mailbox.
        let (out_tx, mut out_rx) = unbounded_channel::<String>();
        let addr = ctx.address();
        actix::spawn(async move {
            while let Some(payload) = out_rx.recv().await {
                addr.do_send(OutboundFrame(payload));
            }
        });

        let (event_tx, mut event_rx) = unbounded_channel::<ClientEvent>();
        self.events = Some(event_tx);

        // Presence registration runs before the first event is handled, and
        // the loop keeps this connection's events in arrival order.
        let delivery = self.delivery.clone();
        let user_id = self.user_id;
        let connection_id = self.connection_id;
        actix::spawn(async move {
            router::handle_connect(&delivery, user_id, connection_id, out_tx).await;
            while let Some(event) = event_rx.recv().await {
                router::dispatch(&delivery, user_id, event).await;
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Dropping the event sender ends the worker loop after it drains.
        self.events = None;

        let delivery = self.delivery.clone();
        let user_id = self.user_id;
        let connection_id = self.connection_id;
        actix::spawn(async move {
            router::handle_disconnect(&delivery, user_id, connection_id).await;
        });
    }
}

impl Handler<OutboundFrame> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if let Some(events) = &self.events {
                        let _ = events.send(event);
                    }
                }
                Err(e) => {
                    tracing::warn!(user_id = %self.user_id, error = %e, "unparseable client event");
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!(user_id = %self.user_id, "binary frames are not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(user_id = %self.user_id, ?reason, "close frame received");
                ctx.stop();
            }
            _ => {}
        }
    }
}
