//! Request handlers for the server endpoints

pub mod status;
pub mod websocket;

pub use status::{health, status};
pub use websocket::handle_ws_client;

use std::convert::Infallible;
use warp::Filter;

use crate::constants::WS_PATH;
use crate::core::SharedRelayServer;

/// All routes served by the relay: WebSocket upgrade on `/` and `/ws`,
/// plus the status endpoints
pub fn routes(
    server: SharedRelayServer,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let ws_route = warp::path::end()
        .or(warp::path(WS_PATH).and(warp::path::end()))
        .unify()
        .and(warp::ws())
        .and(with_server(server.clone()))
        .map(|ws: warp::ws::Ws, server: SharedRelayServer| {
            ws.on_upgrade(move |socket| handle_ws_client(socket, server))
        });

    let status_route = warp::get()
        .and(warp::path::end())
        .and(with_server(server))
        .and_then(status);

    let health_route = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .and_then(health);

    ws_route.or(status_route).or(health_route)
}

// Helper function to include the relay server in request state
fn with_server(
    server: SharedRelayServer,
) -> impl Filter<Extract = (SharedRelayServer,), Error = Infallible> + Clone {
    warp::any().map(move || server.clone())
}
