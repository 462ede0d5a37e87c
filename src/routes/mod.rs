pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::auth::AuthMiddleware;
use crate::error::{json_error_handler, query_error_handler};

/// Registers every route. The store (`web::Data<dyn Store>`) and the
/// `web::Data<TokenService>` are expected to be provided by the caller.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(health::health)
        .service(users::signup)
        .service(users::login)
        .service(users::logout)
        .service(users::logout_all)
        // `/users/me/...` must be registered before `/users/{id}/avatar`.
        .service(users::get_me)
        .service(users::update_me)
        .service(users::delete_me)
        .service(users::upload_avatar)
        .service(users::get_my_avatar)
        .service(users::delete_avatar)
        .service(users::get_user_avatar)
        .service(
            web::scope("/tasks")
                .wrap(AuthMiddleware)
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
