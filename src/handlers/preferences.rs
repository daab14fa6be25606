/// Notification settings handlers
use super::ApiResponse;
use crate::services::NotificationService;
use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Partial settings update; omitted fields keep their stored value
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpdateSettingsPayload {
    pub in_app_enabled: Option<bool>,
    pub push_enabled: Option<bool>,
    pub push_follows: Option<bool>,
    pub push_likes: Option<bool>,
    pub push_comments: Option<bool>,
    pub push_gifts: Option<bool>,
    pub push_challenges: Option<bool>,
    pub push_live: Option<bool>,
    pub push_wallet: Option<bool>,
    pub push_profile_reminders: Option<bool>,
    pub quiet_hours_start: Option<i32>,
    pub quiet_hours_end: Option<i32>,
}

/// Get a user's notification settings (created on first read)
///
/// GET /api/v1/preferences/{user_id}
pub async fn get_settings(
    service: web::Data<Arc<NotificationService>>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let settings = service.get_settings(user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(settings)))
}

/// Update a user's notification settings
///
/// PUT /api/v1/preferences/{user_id}
pub async fn update_settings(
    service: web::Data<Arc<NotificationService>>,
    path: web::Path<Uuid>,
    req: web::Json<UpdateSettingsPayload>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();

    // get_settings guarantees the row exists before the update
    let mut settings = service.get_settings(user_id).await?;

    if let Some(in_app_enabled) = req.in_app_enabled {
        settings.in_app_enabled = in_app_enabled;
    }
    if let Some(push_enabled) = req.push_enabled {
        settings.push_enabled = push_enabled;
    }
    if let Some(push_follows) = req.push_follows {
        settings.push_follows = push_follows;
    }
    if let Some(push_likes) = req.push_likes {
        settings.push_likes = push_likes;
    }
    if let Some(push_comments) = req.push_comments {
        settings.push_comments = push_comments;
    }
    if let Some(push_gifts) = req.push_gifts {
        settings.push_gifts = push_gifts;
    }
    if let Some(push_challenges) = req.push_challenges {
        settings.push_challenges = push_challenges;
    }
    if let Some(push_live) = req.push_live {
        settings.push_live = push_live;
    }
    if let Some(push_wallet) = req.push_wallet {
        settings.push_wallet = push_wallet;
    }
    if let Some(push_profile_reminders) = req.push_profile_reminders {
        settings.push_profile_reminders = push_profile_reminders;
    }
    if req.quiet_hours_start.is_some() {
        settings.quiet_hours_start = req.quiet_hours_start;
    }
    if req.quiet_hours_end.is_some() {
        settings.quiet_hours_end = req.quiet_hours_end;
    }

    let stored = service.update_settings(&settings).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(stored)))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/preferences")
            .route("/{user_id}", web::get().to(get_settings))
            .route("/{user_id}", web::put().to(update_settings)),
    );
}
