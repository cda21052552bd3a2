pub mod appointments;
pub mod auth;
pub mod dashboard;
pub mod patients;
pub mod users;

use actix_web::{get, web, HttpResponse};
use common::ApiResponse;

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::message_only("ok"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(auth::register)
        .service(auth::login)
        .service(auth::me)
        .service(auth::logout)
        .service(auth::refresh)
        // literal segment before the {id} matcher
        .service(users::doctors)
        .service(users::list)
        .service(users::create)
        .service(users::get)
        .service(users::update)
        .service(users::remove)
        .service(patients::list)
        .service(patients::get)
        .service(patients::create)
        .service(patients::update)
        .service(patients::remove)
        .service(patients::medical_history)
        .service(patients::medications)
        .service(appointments::availability)
        .service(appointments::list)
        .service(appointments::get)
        .service(appointments::create)
        .service(appointments::update)
        .service(appointments::cancel)
        .service(dashboard::stats)
        .service(dashboard::recent_activity);
}
