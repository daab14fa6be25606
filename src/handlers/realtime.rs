/// Realtime relay status endpoints
use crate::realtime::ConnectionManager;
use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Connection status for one user
///
/// GET /api/v1/realtime/status/{user_id}
pub async fn status(
    path: web::Path<Uuid>,
    relay: web::Data<Arc<ConnectionManager>>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let connection_count = relay.connection_count(user_id).await;

    Ok(HttpResponse::Ok().json(json!({
        "user_id": user_id.to_string(),
        "connected": connection_count > 0,
        "connection_count": connection_count
    })))
}

/// Relay-wide connection metrics
///
/// GET /api/v1/realtime/metrics
pub async fn relay_metrics(
    relay: web::Data<Arc<ConnectionManager>>,
) -> ActixResult<HttpResponse> {
    let total_connections = relay.total_connections().await;
    let connected_users = relay.connected_users_count().await;

    Ok(HttpResponse::Ok().json(json!({
        "total_connections": total_connections,
        "connected_users": connected_users,
    })))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/realtime")
            .route("/status/{user_id}", web::get().to(status))
            .route("/metrics", web::get().to(relay_metrics)),
    );
}
