#![doc = "The `taskdesk` library crate."]
#![doc = ""]
#![doc = "Route handlers, the auth guard and token service, domain records, the"]
#![doc = "persistence seam and error handling for the taskdesk API. The binary"]
#![doc = "(`main.rs`) wires them to a Postgres store and an `HttpServer`."]

pub mod auth;
pub mod avatar;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;

pub use crate::error::AppError;
