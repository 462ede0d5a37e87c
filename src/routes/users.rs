use crate::{
    auth::{
        hash_password, verify_password, AuthMiddleware, AuthResponse, AuthenticatedUser,
        LoginRequest, TokenService,
    },
    avatar,
    error::AppError,
    models::{patch::parse_patch, user::normalize_email, NewUser, UserChanges, UserInput, UserUpdate},
    store::Store,
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::{json, Map, Value};
use uuid::Uuid;
use validator::Validate;

/// Register a new user
///
/// Creates the account, opens its first session and returns `{user, token}` with 201.
#[post("/users")]
pub async fn signup(
    store: web::Data<dyn Store>,
    tokens: web::Data<TokenService>,
    input: web::Json<UserInput>,
) -> Result<impl Responder, AppError> {
    let input = input.into_inner().normalized();
    input.validate()?;

    let password = input.password;
    let password_hash = web::block(move || hash_password(&password)).await??;

    let user = store
        .insert_user(NewUser {
            name: input.name,
            email: input.email,
            password_hash,
            age: input.age,
        })
        .await?;
    let token = tokens.issue(store.get_ref(), user.id).await?;

    log::info!("user {} signed up", user.id);
    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Login user
///
/// Opens an additional session; existing sessions stay valid. Unknown email and
/// wrong password are reported identically.
#[post("/users/login")]
pub async fn login(
    store: web::Data<dyn Store>,
    tokens: web::Data<TokenService>,
    credentials: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let LoginRequest { email, password } = credentials.into_inner();
    let email = normalize_email(&email);

    let user = match store.find_user_by_email(&email).await? {
        Some(user) => user,
        None => {
            log::info!("failed login attempt for unknown email");
            return Err(unable_to_login());
        }
    };

    let hash = user.password_hash.clone();
    if !web::block(move || verify_password(&password, &hash)).await?? {
        log::info!("failed login attempt for user {}", user.id);
        return Err(unable_to_login());
    }

    let token = tokens.issue(store.get_ref(), user.id).await?;
    log::info!("user {} logged in", user.id);
    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

fn unable_to_login() -> AppError {
    AppError::BadRequest("Unable to login".into())
}

#[post("/users/logout", wrap = "AuthMiddleware")]
pub async fn logout(
    store: web::Data<dyn Store>,
    tokens: web::Data<TokenService>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    tokens
        .revoke(store.get_ref(), auth.user.id, &auth.token)
        .await
        .map_err(|e| {
            log::error!("logout failed for user {}: {}", auth.user.id, e);
            AppError::InternalServerError("Failed to log out".into())
        })?;

    log::info!("user {} logged out", auth.user.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully logged out" })))
}

#[post("/users/logoutall", wrap = "AuthMiddleware")]
pub async fn logout_all(
    store: web::Data<dyn Store>,
    tokens: web::Data<TokenService>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    tokens
        .revoke_all(store.get_ref(), auth.user.id)
        .await
        .map_err(|e| {
            log::error!("logout-all failed for user {}: {}", auth.user.id, e);
            AppError::InternalServerError("Failed to log out".into())
        })?;

    log::info!("user {} logged out of all sessions", auth.user.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully logged out of all sessions" })))
}

#[get("/users/me", wrap = "AuthMiddleware")]
pub async fn get_me(auth: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(auth.user)
}

/// Update profile
///
/// Accepts only `name`, `email`, `password` and `age`. Any other key rejects the
/// whole request before anything is written.
#[patch("/users/me", wrap = "AuthMiddleware")]
pub async fn update_me(
    store: web::Data<dyn Store>,
    auth: AuthenticatedUser,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let update: UserUpdate = parse_patch(body.into_inner(), UserUpdate::ALLOWED_FIELDS)?;
    let update = update.normalized();
    update.validate()?;

    let password_hash = match update.password {
        Some(password) => Some(web::block(move || hash_password(&password)).await??),
        None => None,
    };

    let changes = UserChanges {
        name: update.name,
        email: update.email,
        password_hash,
        age: update.age,
    };
    let user = store
        .update_user(auth.user.id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Delete account
///
/// Tasks created by the account are not removed.
#[delete("/users/me", wrap = "AuthMiddleware")]
pub async fn delete_me(
    store: web::Data<dyn Store>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = store
        .delete_user(auth.user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    log::info!("user {} deleted their account", user.id);
    Ok(HttpResponse::Ok().json(user))
}

/// Upload avatar
///
/// Expects a multipart body with a JPG/JPEG/PNG file in the `avatar` field.
/// The image is stored as a 250x250 PNG, replacing any previous avatar.
#[post("/users/me/avatar", wrap = "AuthMiddleware")]
pub async fn upload_avatar(
    store: web::Data<dyn Store>,
    auth: AuthenticatedUser,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let upload = avatar::read_upload(payload).await?;
    let normalized = web::block(move || avatar::normalize(&upload)).await??;

    store.set_avatar(auth.user.id, Some(normalized)).await?;
    Ok(HttpResponse::Ok().finish())
}

#[get("/users/me/avatar", wrap = "AuthMiddleware")]
pub async fn get_my_avatar(auth: AuthenticatedUser) -> Result<impl Responder, AppError> {
    avatar_response(auth.user.avatar)
}

#[delete("/users/me/avatar", wrap = "AuthMiddleware")]
pub async fn delete_avatar(
    store: web::Data<dyn Store>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    store.set_avatar(auth.user.id, None).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Public avatar lookup. Must be registered after the `/users/me/...` routes.
#[get("/users/{id}/avatar")]
pub async fn get_user_avatar(
    store: web::Data<dyn Store>,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let user = store
        .find_user(user_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    avatar_response(user.avatar)
}

fn avatar_response(avatar: Option<Vec<u8>>) -> Result<HttpResponse, AppError> {
    match avatar {
        Some(bytes) if !bytes.is_empty() => Ok(HttpResponse::Ok()
            .content_type(avatar::AVATAR_CONTENT_TYPE)
            .body(bytes)),
        _ => Err(AppError::NotFound("Avatar not found".into())),
    }
}
