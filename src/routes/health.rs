use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::store::Store;

/// Liveness and store reachability.
///
/// 200 with `"store": "up"` when the backing store answers, otherwise 503 with
/// `"store": "down"`. Unauthenticated.
#[get("/health")]
pub async fn health(store: web::Data<dyn Store>) -> impl Responder {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "store": "up",
            "timestamp": Utc::now()
        })),
        Err(e) => {
            log::warn!("health check: store unreachable: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "degraded",
                "store": "down",
                "timestamp": Utc::now()
            }))
        }
    }
}
