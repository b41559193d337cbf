//! Read-only HTTP status endpoints

use serde::Serialize;
use std::convert::Infallible;

use crate::core::SharedRelayServer;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: &'static str,
    pub connected_clients: usize,
    /// Seconds since the relay started
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
}

pub async fn status(server: SharedRelayServer) -> Result<impl warp::Reply, Infallible> {
    let report = StatusReport {
        status: "running",
        connected_clients: server.connection_count().await,
        uptime: server.uptime().as_secs_f64(),
    };
    Ok(warp::reply::json(&report))
}

pub async fn health() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&HealthReport { status: "ok" }))
}
