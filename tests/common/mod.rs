#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use taskdesk::auth::TokenService;
use taskdesk::routes;
use taskdesk::store::{MemoryStore, Store};
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const BOUNDARY: &str = "----taskdesk-test-boundary";

// Helper struct to hold auth details
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", self.token))
    }
}

pub fn app_data(store: &Arc<MemoryStore>) -> (web::Data<dyn Store>, web::Data<TokenService>) {
    let shared: Arc<dyn Store> = store.clone();
    (
        web::Data::from(shared),
        web::Data::new(TokenService::new(JWT_SECRET, None)),
    )
}

pub async fn test_app(
    store: &Arc<MemoryStore>,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    let (store, tokens) = app_data(store);
    test::init_service(
        App::new()
            .app_data(store)
            .app_data(tokens)
            .wrap(Logger::default())
            .configure(routes::config),
    )
    .await
}

pub async fn signup(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    name: &str,
    email: &str,
    password: &str,
) -> TestUser {
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({
            "name": name,
            "email": email,
            "password": password
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(
        resp.status(),
        actix_web::http::StatusCode::CREATED,
        "Setup: failed to sign up {}",
        email
    );
    let body: Value = test::read_body_json(resp).await;

    TestUser {
        id: body["user"]["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("signup response carries the user id"),
        token: body["token"]
            .as_str()
            .expect("signup response carries a token")
            .to_string(),
    }
}

pub async fn create_task(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    user: &TestUser,
    description: &str,
    completed: bool,
) -> Uuid {
    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(user.bearer())
        .set_json(json!({ "description": description, "completed": completed }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
}

/// Encodes a solid-colour image in the given format.
pub fn sample_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([220, 40, 40])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// Builds a single-file `multipart/form-data` body. Returns (content type, body).
pub fn multipart_file(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
        boundary = BOUNDARY,
        field = field,
        filename = filename,
        content_type = content_type,
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
