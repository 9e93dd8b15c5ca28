use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, Error, HttpMessage, HttpRequest,
};
use uuid::Uuid;

use crate::{
    api::error,
    utils::{Claims, JwtSecret},
};

fn bearer_claims(req: &ServiceRequest) -> Option<Result<Claims, error::Error>> {
    let auth = req.headers().get("Authorization")?;
    let token = match auth.to_str().ok().and_then(|h| h.strip_prefix("Bearer ")) {
        Some(t) => t,
        None => return Some(Err(error::Error::unauthorized("Token Invalid or Expired"))),
    };

    let Some(secret) = req.app_data::<web::Data<JwtSecret>>() else {
        log::error!("JwtSecret missing from app data");
        return Some(Err(error::Error::InternalServer));
    };

    Some(
        Claims::decode(token, secret.as_bytes())
            .map_err(|_| error::Error::unauthorized("Token Invalid or Expired")),
    )
}

/// Requires a valid bearer token.
pub async fn authentication<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    let claims = match bearer_claims(&req) {
        Some(claims) => claims?,
        None => return Err(error::Error::unauthorized("Token Invalid or Expired").into()),
    };

    req.extensions_mut().insert(claims);

    next.call(req).await
}

/// Attaches the caller identity when a token is present; anonymous requests
/// pass through, malformed or expired tokens are rejected.
pub async fn identify<B>(req: ServiceRequest, next: Next<B>) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    if let Some(claims) = bearer_claims(&req) {
        req.extensions_mut().insert(claims?);
    }

    next.call(req).await
}

pub fn get_claims(req: &HttpRequest) -> Result<Claims, error::Error> {
    let extensions = req.extensions();

    let claims = extensions
        .get::<Claims>()
        .ok_or_else(|| error::Error::unauthorized("Unauthorized"))?
        .clone();

    Ok(claims)
}

/// Caller identity, `None` for anonymous requests.
pub fn get_owner(req: &HttpRequest) -> Option<Uuid> {
    req.extensions().get::<Claims>().map(|claims| claims.sub)
}
