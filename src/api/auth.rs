//! Request identity extractors.
//!
//! Authentication happens upstream. The authenticating proxy forwards the
//! resolved identity in two headers, which these extractors turn into a
//! [`User`] and check against the route's role requirement.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::{Role, User};
use crate::error::GatewayError;

/// Header carrying the authenticated username.
pub const USER_HEADER: &str = "x-authenticated-user";

/// Header carrying the authenticated role.
pub const ROLE_HEADER: &str = "x-authenticated-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, GatewayError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| GatewayError::Unauthorized(format!("missing {name} header")))?;
    let value = value
        .to_str()
        .map_err(|_| GatewayError::Unauthorized(format!("{name} header is not valid text")))?
        .trim();
    if value.is_empty() {
        return Err(GatewayError::Unauthorized(format!("{name} header is empty")));
    }
    Ok(value)
}

fn identity(parts: &Parts) -> Result<User, GatewayError> {
    let username = header(parts, USER_HEADER)?;
    let role = header(parts, ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|e| GatewayError::Unauthorized(e.to_string()))?;
    Ok(User::new(username, role))
}

/// An authenticated user with the `Customer` role.
#[derive(Debug, Clone)]
pub struct CustomerUser(pub User);

impl<S> FromRequestParts<S> for CustomerUser
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = identity(parts)?;
        if !user.is_customer() {
            return Err(GatewayError::Unauthorized(
                "route requires the Customer role".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

/// An authenticated user with the `Admin` or `Manager` role.
#[derive(Debug, Clone)]
pub struct PrivilegedUser(pub User);

impl<S> FromRequestParts<S> for PrivilegedUser
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = identity(parts)?;
        if !user.is_privileged() {
            return Err(GatewayError::Unauthorized(
                "route requires the Admin or Manager role".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn request_parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let Ok(request) = builder.body(()) else {
            panic!("request must build");
        };
        request.into_parts().0
    }

    #[tokio::test]
    async fn customer_headers_resolve_to_customer() {
        let mut parts = request_parts(&[(USER_HEADER, "alice"), (ROLE_HEADER, "Customer")]);
        let Ok(CustomerUser(user)) = CustomerUser::from_request_parts(&mut parts, &()).await
        else {
            panic!("customer must be accepted");
        };
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Customer);
    }

    #[tokio::test]
    async fn missing_headers_are_unauthorized() {
        let mut parts = request_parts(&[(ROLE_HEADER, "Customer")]);
        assert!(matches!(
            CustomerUser::from_request_parts(&mut parts, &()).await,
            Err(GatewayError::Unauthorized(_))
        ));

        let mut parts = request_parts(&[(USER_HEADER, "  "), (ROLE_HEADER, "Customer")]);
        assert!(matches!(
            CustomerUser::from_request_parts(&mut parts, &()).await,
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn roles_are_enforced() {
        let mut parts = request_parts(&[(USER_HEADER, "boss"), (ROLE_HEADER, "Manager")]);
        assert!(matches!(
            CustomerUser::from_request_parts(&mut parts, &()).await,
            Err(GatewayError::Unauthorized(_))
        ));
        assert!(
            PrivilegedUser::from_request_parts(&mut parts, &())
                .await
                .is_ok()
        );

        let mut parts = request_parts(&[(USER_HEADER, "alice"), (ROLE_HEADER, "Customer")]);
        assert!(matches!(
            PrivilegedUser::from_request_parts(&mut parts, &()).await,
            Err(GatewayError::Unauthorized(_))
        ));

        let mut parts = request_parts(&[(USER_HEADER, "eve"), (ROLE_HEADER, "Root")]);
        assert!(matches!(
            PrivilegedUser::from_request_parts(&mut parts, &()).await,
            Err(GatewayError::Unauthorized(_))
        ));
    }
}
