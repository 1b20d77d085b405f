use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::signature::constant_time_eq;
use crate::errors::AppError;
use crate::AppState;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Customer identity asserted by the authenticating proxy in front of the service.
#[derive(Debug, Clone, Copy)]
pub struct CallerId(pub Uuid);

impl FromRequest for CallerId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let caller = header(req, USER_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(CallerId)
            .ok_or(AppError::Unauthorized);
        ready(caller)
    }
}

/// Present on a request only when `X-Admin-Key` matches the configured key.
#[derive(Debug, Clone, Copy)]
pub struct AdminCaller;

impl FromRequest for AdminCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            return ready(Err(AppError::Internal("application state missing".into())));
        };
        let authorized = header(req, ADMIN_KEY_HEADER)
            .map(|key| constant_time_eq(key, &state.admin_api_key))
            .unwrap_or(false);
        ready(if authorized {
            Ok(AdminCaller)
        } else {
            Err(AppError::Unauthorized)
        })
    }
}
