use crate::error::{forbidden, unauthorized, HttpApiError};
use crate::state::AppState;
use actix_web::dev::ServiceRequest;
use actix_web::{web, FromRequest, HttpMessage};
use common::{AppError, Role};
use db::UserRow;
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

/// Verifies a bearer token and stashes the claims on the request. Runs for
/// every request; routes that need an identity pull it back out through
/// [`Principal`].
pub fn attach_identity(req: &ServiceRequest) {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        return;
    };
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_owned);
    if let Some(tok) = token {
        if let Ok(claims) = auth::verify(&state.jwt, &tok) {
            req.extensions_mut().insert(claims);
        }
    }
}

/// The authenticated account, resolved against the credential store. Token
/// holders whose account was removed or deactivated are rejected here.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub account: UserRow,
}

impl FromRequest for Principal {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let claims = req.extensions().get::<auth::Claims>().cloned();
            let Some(claims) = claims else {
                return Err(unauthorized("authentication required").into());
            };
            let state = req
                .app_data::<web::Data<AppState>>()
                .ok_or_else(|| HttpApiError::from(AppError::Internal))?;
            let account = db::find_user_by_id(&state.db, claims.sub)
                .await
                .map_err(HttpApiError::from)?
                .ok_or_else(|| unauthorized("account no longer exists"))?;
            if !account.is_active {
                return Err(unauthorized("account is deactivated").into());
            }
            let role = Role::parse(&account.role)
                .ok_or_else(|| HttpApiError::from(AppError::Internal))?;
            Ok(Principal {
                id: account.id,
                role,
                account,
            })
        })
    }
}

pub fn require_role(who: &Principal, allowed: &[Role]) -> Result<(), HttpApiError> {
    if allowed.contains(&who.role) {
        Ok(())
    } else {
        Err(forbidden("insufficient permissions"))
    }
}

pub fn require_self_or_admin(who: &Principal, target: Uuid) -> Result<(), HttpApiError> {
    if who.id == target || who.role == Role::Admin {
        Ok(())
    } else {
        Err(forbidden("cannot access another user's resource"))
    }
}
