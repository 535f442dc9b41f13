use crate::jwt::JwtService;
use crate::state::AppState;
use folio_core::prelude::*;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// A wrapper struct indicating a request has been authenticated.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub User);

impl<S, R, G, P, A> FromRequestParts<AppState<S, R, G, P, A>> for AuthenticatedUser
where
    S: StorageBackend,
    R: RecordStore,
    G: ThumbnailService,
    P: ExistenceProbe,
    A: AuthProvider,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, R, G, P, A>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .map(|header| header.strip_prefix("Bearer ").unwrap_or(header).trim())
            .unwrap_or("");

        match state.auth.verify(token).await {
            Ok(user) => Ok(AuthenticatedUser(user)),
            Err(e) => {
                debug!("Rejected request: {e}");
                Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))
            }
        }
    }
}

/// Accepts session tokens minted by this server before asking the wrapped provider.
#[derive(Clone)]
pub struct JWTServiceAuthProvider<P: AuthProvider> {
    jwt_service: JwtService,
    provider: P,
}

impl<P: AuthProvider> JWTServiceAuthProvider<P> {
    pub fn new(jwt_service: JwtService, provider: P) -> Self {
        Self {
            jwt_service,
            provider,
        }
    }
}

impl<P: AuthProvider> AuthProvider for JWTServiceAuthProvider<P> {
    async fn verify(&self, token: &str) -> Result<User, AuthError> {
        if let Ok(user) = self.jwt_service.verify(token) {
            return Ok(user);
        }

        self.provider.verify(token).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.provider.login(email, password).await
    }
}

/// The single site administrator: the backend's service-role key as a bearer token,
/// or the configured email/password pair at `/auth/login`.
#[derive(Clone, Default)]
pub struct AdminCredentialsAuth {
    service_role_key: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

fn admin_user(id: impl Into<String>) -> User {
    User {
        id: id.into(),
        scopes: vec!["admin".to_string(), "read".to_string(), "write".to_string()],
    }
}

impl AdminCredentialsAuth {
    pub fn new(
        service_role_key: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            service_role_key,
            email,
            password,
        }
    }

    pub fn from_config(config: &FolioConfig) -> Self {
        if config.admin_email.is_none() || config.admin_password.is_none() {
            warn!("Admin credentials not configured; /auth/login will reject every attempt");
        }
        Self::new(
            config.service_role_key.clone(),
            config.admin_email.clone(),
            config.admin_password.clone(),
        )
    }
}

/// Compares secrets in time independent of where they first differ.
fn secret_eq(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

impl AuthProvider for AdminCredentialsAuth {
    async fn verify(&self, token: &str) -> Result<User, AuthError> {
        match &self.service_role_key {
            Some(key) if !token.is_empty() && secret_eq(token, key) => {
                Ok(admin_user("service_role"))
            }
            _ => Err(AuthError::InvalidToken),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let (Some(expected_email), Some(expected_password)) = (&self.email, &self.password) else {
            return Err(AuthError::InvalidCredentials);
        };
        let email_ok = secret_eq(
            &email.to_ascii_lowercase(),
            &expected_email.to_ascii_lowercase(),
        );
        let password_ok = secret_eq(password, expected_password);
        if email_ok & password_ok {
            Ok(admin_user(expected_email.clone()))
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AdminCredentialsAuth {
        AdminCredentialsAuth::new(
            Some("service-key".into()),
            Some("admin@example.com".into()),
            Some("hunter2".into()),
        )
    }

    #[tokio::test]
    async fn service_key_is_admin() {
        let user = auth().verify("service-key").await.unwrap();
        assert!(user.scopes.contains(&"admin".to_string()));
        assert!(auth().verify("anon-key").await.is_err());
        assert!(AdminCredentialsAuth::default().verify("").await.is_err());
    }

    #[tokio::test]
    async fn near_miss_secrets_are_rejected() {
        assert!(auth().verify("service-ke").await.is_err());
        assert!(auth().verify("service-key ").await.is_err());
        assert!(auth().login("admin@example.com", "hunter").await.is_err());
        assert!(auth().login("admin@example.co", "hunter2").await.is_err());
        assert!(secret_eq("abc", "abc"));
        assert!(!secret_eq("abc", "abd"));
    }

    #[tokio::test]
    async fn login_checks_both_fields() {
        assert_eq!(
            auth().login("Admin@Example.com", "hunter2").await.unwrap().id,
            "admin@example.com"
        );
        assert!(matches!(
            auth().login("admin@example.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(AdminCredentialsAuth::default().login("", "").await.is_err());
    }

    #[tokio::test]
    async fn jwt_wrapper_prefers_session_tokens() {
        let jwt = JwtService::new("secret");
        let token = jwt
            .mint(&admin_user("admin@example.com"), chrono::Duration::hours(1))
            .unwrap();
        let provider = JWTServiceAuthProvider::new(jwt, auth());

        assert_eq!(provider.verify(&token).await.unwrap().id, "admin@example.com");
        assert_eq!(provider.verify("service-key").await.unwrap().id, "service_role");
        assert!(provider.verify("garbage").await.is_err());
    }
}
