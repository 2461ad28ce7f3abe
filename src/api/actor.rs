//! The acting user, as resolved by the authenticating proxy in front of this service.
//!
//! A request without `x-forum-user-id` is anonymous. Groups and rights are
//! comma-separated lists.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::actor::Actor;
use crate::api::response::ApiError;

pub const USER_ID_HEADER: &str = "x-forum-user-id";
pub const USER_NAME_HEADER: &str = "x-forum-user-name";
pub const USER_GROUPS_HEADER: &str = "x-forum-user-groups";
pub const USER_RIGHTS_HEADER: &str = "x-forum-user-rights";

pub struct RequestActor(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
        let headers = &parts.headers;

        let id = match header_str(headers, USER_ID_HEADER)? {
            Some(raw) => Some(raw.trim().parse().map_err(|_| {
                ApiError::bad_request(format!("{USER_ID_HEADER} must be a non-negative integer"))
            })?),
            None => None,
        };

        let actor = Actor {
            id,
            name: header_str(headers, USER_NAME_HEADER)?
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            groups: header_list(headers, USER_GROUPS_HEADER)?,
            rights: header_list(headers, USER_RIGHTS_HEADER)?,
        };
        Ok(RequestActor(actor))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| ApiError::bad_request(format!("{name} must be valid ASCII")))
        })
        .transpose()
}

fn header_list<C>(headers: &HeaderMap, name: &str) -> Result<C, ApiError>
where
    C: FromIterator<String>,
{
    Ok(header_str(headers, name)?
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}
