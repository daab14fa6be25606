/// Notification endpoints: single-recipient notify, listing, read state,
/// deletion, and the fan-out triggers used by other services.
use super::ApiResponse;
use crate::models::{NotificationCategory, WriteNotification};
use crate::services::{FanoutService, NotificationService};
use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Request to notify one recipient
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotifyPayload {
    pub user_id: Uuid,
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub image_url: Option<String>,
    pub actor_id: Option<Uuid>,
    pub target_id: Option<Uuid>,
    pub target_type: Option<String>,
}

/// Request to fan a notification out to a creator's followers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FollowerFanoutPayload {
    pub creator_id: Uuid,
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub image_url: Option<String>,
}

/// Request to fan a notification out to a club's members
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClubFanoutPayload {
    pub exclude_user_id: Option<Uuid>,
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: Uuid,
}

/// Notify one recipient
///
/// POST /api/v1/notifications
pub async fn notify(
    fanout: web::Data<Arc<FanoutService>>,
    req: web::Json<NotifyPayload>,
) -> ActixResult<HttpResponse> {
    let payload = req.into_inner();
    let write = WriteNotification {
        user_id: payload.user_id,
        category: payload.category,
        title: payload.title,
        body: payload.body,
        data: payload.data,
        image_url: payload.image_url,
        actor_id: payload.actor_id,
        target_id: payload.target_id,
        target_type: payload.target_type,
    };

    let delivery = fanout.notify_user(write).await?;
    match delivery {
        Some(delivery) => Ok(HttpResponse::Ok().json(ApiResponse::ok(delivery))),
        // Gate closed: deliberate no-op, not an error
        None => Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({
            "skipped": true
        })))),
    }
}

/// Fan out to a creator's followers
///
/// POST /api/v1/notifications/fanout/followers
pub async fn fanout_followers(
    fanout: web::Data<Arc<FanoutService>>,
    req: web::Json<FollowerFanoutPayload>,
) -> ActixResult<HttpResponse> {
    let summary = fanout
        .notify_followers(
            req.creator_id,
            req.category,
            &req.title,
            &req.body,
            req.data.clone(),
            req.image_url.clone(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(summary)))
}

/// Fan out to a club's members
///
/// POST /api/v1/notifications/fanout/clubs/{club_id}
pub async fn fanout_club(
    fanout: web::Data<Arc<FanoutService>>,
    path: web::Path<Uuid>,
    req: web::Json<ClubFanoutPayload>,
) -> ActixResult<HttpResponse> {
    let club_id = path.into_inner();
    let summary = fanout
        .notify_club_members(
            club_id,
            req.exclude_user_id,
            req.category,
            &req.title,
            &req.body,
            req.data.clone(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(summary)))
}

/// List a user's notifications, newest first
///
/// GET /api/v1/notifications/user/{user_id}
pub async fn list_notifications(
    service: web::Data<Arc<NotificationService>>,
    path: web::Path<Uuid>,
    query: web::Query<ListQuery>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let notifications = service
        .list_notifications(
            user_id,
            query.limit.unwrap_or(20),
            query.offset.unwrap_or(0),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(notifications)))
}

/// Live unread count
///
/// GET /api/v1/notifications/user/{user_id}/unread-count
pub async fn unread_count(
    service: web::Data<Arc<NotificationService>>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let count = service.unread_count(user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({
        "unread_count": count
    }))))
}

/// Mark one notification read (idempotent)
///
/// PUT /api/v1/notifications/{id}/read?user_id=...
pub async fn mark_read(
    service: web::Data<Arc<NotificationService>>,
    path: web::Path<Uuid>,
    query: web::Query<OwnerQuery>,
) -> ActixResult<HttpResponse> {
    let notification_id = path.into_inner();
    service
        .mark_read(query.user_id, notification_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({"success": true}))))
}

/// Mark all of a user's notifications read
///
/// PUT /api/v1/notifications/user/{user_id}/read-all
pub async fn mark_all_read(
    service: web::Data<Arc<NotificationService>>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();
    let updated = service.mark_all_read(user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({
        "updated": updated
    }))))
}

/// Delete a notification on explicit user action
///
/// DELETE /api/v1/notifications/{id}?user_id=...
pub async fn delete_notification(
    service: web::Data<Arc<NotificationService>>,
    path: web::Path<Uuid>,
    query: web::Query<OwnerQuery>,
) -> ActixResult<HttpResponse> {
    let notification_id = path.into_inner();
    service
        .delete_notification(query.user_id, notification_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({"success": true}))))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .route("", web::post().to(notify))
            .route("/fanout/followers", web::post().to(fanout_followers))
            .route("/fanout/clubs/{club_id}", web::post().to(fanout_club))
            .route("/user/{user_id}", web::get().to(list_notifications))
            .route(
                "/user/{user_id}/unread-count",
                web::get().to(unread_count),
            )
            .route("/user/{user_id}/read-all", web::put().to(mark_all_read))
            .route("/{id}/read", web::put().to(mark_read))
            .route("/{id}", web::delete().to(delete_notification)),
    );
}
