use crate::error::{conflict, unauthorized, validation, HttpApiError};
use crate::extractors::Principal;
use crate::schemas::{LoginInput, RegisterInput};
use crate::state::AppState;
use actix_web::{get, post, web, HttpResponse};
use auth::{hash_password, verify_password};
use common::{ApiResponse, AppError};
use serde_json::json;
use tracing::info;

#[post("/auth/register")]
pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();
    let role = payload.validate().map_err(validation)?;

    if db::find_user_by_email(&data.db, &payload.email)
        .await?
        .is_some()
    {
        return Err(conflict("email is already registered"));
    }
    if db::find_user_by_username(&data.db, &payload.username)
        .await?
        .is_some()
    {
        return Err(conflict("username is already taken"));
    }

    let hash = hash_password(&payload.password).map_err(|_| AppError::Internal)?;
    let user = db::insert_user(
        &data.db,
        payload.username.trim(),
        &payload.email,
        &hash,
        payload.first_name.trim(),
        payload.last_name.trim(),
        role.as_str(),
    )
    .await
    .map_err(|e| match e {
        db::DbError::Duplicate => conflict("email or username is already taken"),
        other => other.into(),
    })?;

    info!(user = %user.id, role = %user.role, "account registered");

    let token = auth::sign(&data.jwt, user.id, &user.email, &user.role, data.token_ttl)
        .map_err(|_| AppError::Internal)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok_message(
        json!({ "user": user, "token": token }),
        "account created",
    )))
}

#[post("/auth/login")]
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginInput>,
) -> Result<HttpResponse, HttpApiError> {
    let payload = payload.into_inner();

    let user = db::find_user_by_email(&data.db, &payload.email)
        .await?
        .ok_or_else(|| unauthorized("invalid credentials"))?;
    if !verify_password(&payload.password, &user.password_hash) {
        return Err(unauthorized("invalid credentials"));
    }
    if !user.is_active {
        return Err(unauthorized("account is deactivated"));
    }

    db::touch_last_login(&data.db, user.id).await?;
    let token = auth::sign(&data.jwt, user.id, &user.email, &user.role, data.token_ttl)
        .map_err(|_| AppError::Internal)?;

    info!(user = %user.id, "login");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "user": user, "token": token }))))
}

#[get("/auth/me")]
pub async fn me(who: Principal) -> Result<HttpResponse, HttpApiError> {
    Ok(HttpResponse::Ok().json(ApiResponse::ok(who.account)))
}

#[post("/auth/logout")]
pub async fn logout(who: Principal) -> Result<HttpResponse, HttpApiError> {
    // bearer tokens are stateless; the client just drops its copy
    info!(user = %who.id, "logout");
    Ok(HttpResponse::Ok().json(ApiResponse::message_only("logged out")))
}

#[post("/auth/refresh")]
pub async fn refresh(
    data: web::Data<AppState>,
    who: Principal,
) -> Result<HttpResponse, HttpApiError> {
    let token = auth::sign(
        &data.jwt,
        who.id,
        &who.account.email,
        &who.account.role,
        data.token_ttl,
    )
    .map_err(|_| AppError::Internal)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "token": token }))))
}
