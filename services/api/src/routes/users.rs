use crate::error::{conflict, not_found, parse_id, validation, HttpApiError};
use crate::extractors::{require_role, require_self_or_admin, Principal};
use crate::schemas::{RegisterInput, UserUpdateInput};
use crate::state::AppState;
use actix_web::{delete, get, post, put, web, HttpResponse};
use auth::hash_password;
use common::{ApiResponse, AppError, PageQuery, Pagination, Role};
use tracing::info;

#[get("/users")]
pub async fn list(
    data: web::Data<AppState>,
    who: Principal,
    page: web::Query<PageQuery>,
) -> Result<HttpResponse, HttpApiError> {
    require_role(&who, &[Role::Admin])?;
    let (page_no, limit) = page.clamp();
    let (rows, total) = db::list_users(&data.db, limit, page.offset()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::page(rows, Pagination::new(page_no, limit, total))))
}

#[get("/users/doctors")]
pub async fn doctors(
    data: web::Data<AppState>,
    _who: Principal,
) -> Result<HttpResponse, HttpApiError> {
    let rows = db::list_doctors(&data.db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(rows)))
}

/// Direct account creation by an admin; unlike /auth/register no token is
/// issued for the new account.
#[post("/users")]
pub async fn create(
    data: web::Data<AppState>,
    who: Principal,
    payload: web::Json<RegisterInput>,
) -> Result<HttpResponse, HttpApiError> {
    require_role(&who, &[Role::Admin])?;
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

    info!(user = %user.id, role = %user.role, by = %who.id, "user created");
    Ok(HttpResponse::Created().json(ApiResponse::ok_message(user, "user created")))
}

#[get("/users/{id}")]
pub async fn get(
    data: web::Data<AppState>,
    who: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, HttpApiError> {
    let id = parse_id(&path)?;
    require_self_or_admin(&who, id)?;
    let user = db::find_user_by_id(&data.db, id)
        .await?
        .ok_or_else(|| not_found("user"))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

#[put("/users/{id}")]
pub async fn update(
    data: web::Data<AppState>,
    who: Principal,
    path: web::Path<String>,
    payload: web::Json<UserUpdateInput>,
) -> Result<HttpResponse, HttpApiError> {
    let id = parse_id(&path)?;
    require_self_or_admin(&who, id)?;
    let payload = payload.into_inner();
    let role = payload.validate().map_err(validation)?;
    if payload.touches_privileged_fields() {
        require_role(&who, &[Role::Admin])?;
    }

    let user = db::update_user(
        &data.db,
        id,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.email.as_deref(),
        role.map(|r| r.as_str()),
        payload.is_active,
    )
    .await
    .map_err(|e| match e {
        db::DbError::Duplicate => conflict("email is already registered"),
        other => other.into(),
    })?
    .ok_or_else(|| not_found("user"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_message(user, "user updated")))
}

#[delete("/users/{id}")]
pub async fn remove(
    data: web::Data<AppState>,
    who: Principal,
    path: web::Path<String>,
) -> Result<HttpResponse, HttpApiError> {
    require_role(&who, &[Role::Admin])?;
    let id = parse_id(&path)?;
    let affected = db::deactivate_user(&data.db, id).await?;
    if affected == 0 {
        return Err(not_found("user"));
    }
    info!(user = %id, by = %who.id, "user deactivated");
    Ok(HttpResponse::Ok().json(ApiResponse::message_only("user deactivated")))
}
