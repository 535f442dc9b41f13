use folio_core::prelude::*;

/// Grants every token and every login full admin rights. Never use outside local development.
#[derive(Clone)]
pub struct AllowAllAuth;

fn dev_user() -> User {
    User {
        id: "dev_user".to_string(),
        scopes: vec!["admin".to_string(), "read".to_string(), "write".to_string()],
    }
}

impl AuthProvider for AllowAllAuth {
    async fn verify(&self, _token: &str) -> Result<User, AuthError> {
        Ok(dev_user())
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<User, AuthError> {
        Ok(dev_user())
    }
}
