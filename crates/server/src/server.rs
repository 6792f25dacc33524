use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as HeaderError, Header},
    typed_header::TypedHeaderRejection,
};

use std::{str::FromStr, sync::Arc};

use crate::records;
use api_types::health::Health;
use engine::{Engine, RecordKind};

/// Default request body limit, big enough for a scanned receipt.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const SERVICE_NAME: &str = "bookkeeping-api";

static USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
static USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Role of the authenticated user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    SuperAdmin,
    Admin,
    Employee,
    Accountant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "superadmin",
            Self::Admin => "admin",
            Self::Employee => "employee",
            Self::Accountant => "accountant",
        }
    }

    /// Roles allowed to permanently delete records.
    pub fn can_purge(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "superadmin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "employee" => Ok(Self::Employee),
            "accountant" => Ok(Self::Accountant),
            _ => Err(()),
        }
    }
}

/// Caller identity, resolved upstream and trusted as authenticated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

/// `TypedHeader` for the `x-user-id` header, a positive integer.
#[derive(Debug)]
struct UserIdHeader(i64);

impl Header for UserIdHeader {
    fn name() -> &'static HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, HeaderError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(HeaderError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(HeaderError::invalid());
        };
        let Ok(value) = value.trim().parse::<i64>() else {
            return Err(HeaderError::invalid());
        };
        if value <= 0 {
            return Err(HeaderError::invalid());
        }

        Ok(UserIdHeader(value))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        values.extend(std::iter::once(HeaderValue::from(self.0)));
    }
}

/// `TypedHeader` for the `x-user-role` header.
#[derive(Debug)]
struct RoleHeader(Role);

impl Header for RoleHeader {
    fn name() -> &'static HeaderName {
        &USER_ROLE_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, HeaderError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(HeaderError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(HeaderError::invalid());
        };
        value
            .parse()
            .map(RoleHeader)
            .map_err(|()| HeaderError::invalid())
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        values.extend(std::iter::once(HeaderValue::from_static(self.0.as_str())));
    }
}

async fn identity(
    user_id: Result<TypedHeader<UserIdHeader>, TypedHeaderRejection>,
    role: Result<TypedHeader<RoleHeader>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (Ok(TypedHeader(user_id)), Ok(TypedHeader(role))) = (user_id, role) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(Identity {
        user_id: user_id.0,
        role: role.0,
    });
    Ok(next.run(request).await)
}

async fn require_purge_role(
    Extension(identity): Extension<Identity>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !identity.role.can_purge() {
        tracing::debug!(
            user_id = identity.user_id,
            role = identity.role.as_str(),
            "purge refused"
        );
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(request).await)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

fn records_router(kind: RecordKind) -> Router<ServerState> {
    Router::new()
        .route("/", post(records::create).get(records::list))
        .route(
            "/{id}",
            get(records::get)
                .patch(records::update)
                .delete(records::soft_delete),
        )
        .route("/{id}/restore", post(records::restore))
        .route(
            "/{id}/purge",
            delete(records::purge).route_layer(middleware::from_fn(require_purge_role)),
        )
        .layer(Extension(kind))
}

fn router(state: ServerState, max_upload_bytes: usize) -> Router {
    Router::new()
        .nest("/incomes", records_router(RecordKind::Income))
        .nest("/expenses", records_router(RecordKind::Expense))
        .route_layer(middleware::from_fn(identity))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Builds the HTTP application around `engine`.
pub fn app(engine: Engine, max_upload_bytes: usize) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
    };
    router(state, max_upload_bytes)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
    max_upload_bytes: usize,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine, max_upload_bytes)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<H: Header>(raw: &'static str) -> Result<H, HeaderError> {
        let value = HeaderValue::from_static(raw);
        H::decode(&mut std::iter::once(&value))
    }

    #[test]
    fn user_id_header_must_be_positive() {
        assert_eq!(decode::<UserIdHeader>("7").unwrap().0, 7);
        assert!(decode::<UserIdHeader>("0").is_err());
        assert!(decode::<UserIdHeader>("-3").is_err());
        assert!(decode::<UserIdHeader>("seven").is_err());
    }

    #[test]
    fn roles_are_parsed_and_gated() {
        assert_eq!(decode::<RoleHeader>("admin").unwrap().0, Role::Admin);
        assert!(decode::<RoleHeader>("root").is_err());
        assert!(Role::SuperAdmin.can_purge());
        assert!(Role::Admin.can_purge());
        assert!(!Role::Employee.can_purge());
        assert!(!Role::Accountant.can_purge());
    }
}
