/// Push token registration handlers
use super::ApiResponse;
use crate::models::Platform;
use crate::services::push_provider::ensure_token_format;
use crate::services::{NotificationService, PushProvider};
use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Register push token request
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegisterTokenPayload {
    pub user_id: Uuid,
    pub token: String,
    pub platform: String, // "ios", "android", "web"
    pub device_id: Option<String>,
}

/// Unregister push token request (logout)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UnregisterTokenPayload {
    pub user_id: Uuid,
    pub token: String,
}

/// Register a device push token
///
/// POST /api/v1/devices/register
pub async fn register_token(
    service: web::Data<Arc<NotificationService>>,
    provider: web::Data<Arc<dyn PushProvider>>,
    req: web::Json<RegisterTokenPayload>,
) -> ActixResult<HttpResponse> {
    ensure_token_format(provider.get_ref().as_ref(), &req.token)?;

    let platform = Platform::parse(&req.platform);

    let token_id = service
        .register_push_token(
            req.user_id,
            req.token.clone(),
            platform,
            req.device_id.clone(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({
        "token_id": token_id,
        "success": true
    }))))
}

/// Deactivate a device push token on logout
///
/// POST /api/v1/devices/unregister
pub async fn unregister_token(
    service: web::Data<Arc<NotificationService>>,
    req: web::Json<UnregisterTokenPayload>,
) -> ActixResult<HttpResponse> {
    service
        .deactivate_push_token(req.user_id, &req.token)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({
        "success": true
    }))))
}

/// List a user's active tokens
///
/// GET /api/v1/devices/user/{user_id}
pub async fn list_tokens(
    service: web::Data<Arc<NotificationService>>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let tokens = service.active_tokens(user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(tokens)))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/devices")
            .route("/register", web::post().to(register_token))
            .route("/unregister", web::post().to(unregister_token))
            .route("/user/{user_id}", web::get().to(list_tokens)),
    );
}
