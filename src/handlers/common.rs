use crate::errors::ServiceError;
use crate::identity::{canonical_id, Approver, ApproverRole};
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {e}")))
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ServiceError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::ValidationError(format!("missing {name} header")))
}

/// Build the acting approver from the identity headers the upstream auth
/// gateway injects. Ids must be canonical record ids; anything else is
/// rejected here rather than silently failing scope checks downstream.
pub fn extract_approver(headers: &HeaderMap) -> Result<Approver, ServiceError> {
    let id = canonical_id(required_header(headers, "x-actor-id")?, "actor id")?;
    let role = ApproverRole::parse(required_header(headers, "x-actor-role")?)?;
    let company_id = match headers.get("x-company-id").and_then(|v| v.to_str().ok()) {
        Some(raw) => Some(canonical_id(raw, "company id")?),
        None => None,
    };
    if role == ApproverRole::CompanyAdmin && company_id.is_none() {
        return Err(ServiceError::ValidationError(
            "company admins must send an x-company-id header".into(),
        ));
    }
    Ok(Approver {
        id,
        role,
        company_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    #[test]
    fn approver_headers_must_carry_canonical_ids() {
        let mut headers = HeaderMap::new();
        headers.insert("x-actor-id", HeaderValue::from_static("admin-42"));
        headers.insert("x-actor-role", HeaderValue::from_static("site_admin"));
        assert!(matches!(
            extract_approver(&headers),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn company_admin_requires_a_company_header() {
        let id = Uuid::new_v4().to_string();
        let mut headers = HeaderMap::new();
        headers.insert("x-actor-id", HeaderValue::from_str(&id).unwrap());
        headers.insert("x-actor-role", HeaderValue::from_static("company_admin"));
        assert!(matches!(
            extract_approver(&headers),
            Err(ServiceError::ValidationError(_))
        ));

        headers.insert("x-company-id", HeaderValue::from_str(&id).unwrap());
        let approver = extract_approver(&headers).unwrap();
        assert_eq!(approver.role, ApproverRole::CompanyAdmin);
    }
}
