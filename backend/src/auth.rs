//! Admin allow-list check run ahead of every note route.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, error};
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};
use thiserror::Error;

/// Source of the tokens allowed through the gate.
#[rocket::async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn admins(&self) -> Result<Vec<String>>;
}

/// Allow-list stored as a JSON array of strings. Read again on every lookup.
pub struct FileAdminDirectory {
    path: PathBuf,
}

impl FileAdminDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[rocket::async_trait]
impl AdminDirectory for FileAdminDirectory {
    async fn admins(&self) -> Result<Vec<String>> {
        let raw = rocket::tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed reading admin list {}", self.path.display()))?;
        let admins = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed admin list {}", self.path.display()))?;

        Ok(admins)
    }
}

/// Allow-list fixed at startup.
pub struct StaticAdminDirectory(pub Vec<String>);

#[rocket::async_trait]
impl AdminDirectory for StaticAdminDirectory {
    async fn admins(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    Missing,
    #[error("token is not an admin")]
    Forbidden,
    #[error("admin lookup failed: {0:#}")]
    Lookup(anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::Missing => Status::Unauthorized,
            AuthError::Forbidden => Status::Forbidden,
            AuthError::Lookup(_) => Status::InternalServerError,
        }
    }
}

/// `Ok` lets the request continue, `Err` ends it with `AuthError::status`.
pub async fn authorize(token: Option<&str>, directory: &dyn AdminDirectory) -> Result<(), AuthError> {
    let token = match token {
        Some(token) if !token.is_empty() => token,
        _ => return Err(AuthError::Missing),
    };

    let admins = directory.admins().await.map_err(AuthError::Lookup)?;
    if admins.iter().any(|admin| admin == token) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Request guard for an authorized caller. Holds the raw `authorization` header value.
pub struct Admin(String);

impl Admin {
    pub fn token(&self) -> &str {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = request.headers().get_one("authorization");

        let result = match request.rocket().state::<Box<dyn AdminDirectory>>() {
            Some(directory) => authorize(token, directory.as_ref()).await,
            None => Err(AuthError::Lookup(anyhow::anyhow!("no admin directory is managed"))),
        };

        match result {
            Ok(()) => request::Outcome::Success(Admin(token.unwrap_or_default().to_string())),
            Err(e) => {
                match &e {
                    AuthError::Lookup(_) => error!("{}", e),
                    _ => debug!("Rejected {} {}: {}", request.method(), request.uri(), e),
                }
                request::Outcome::Error((e.status(), e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenDirectory;

    #[rocket::async_trait]
    impl AdminDirectory for BrokenDirectory {
        async fn admins(&self) -> Result<Vec<String>> {
            Err(anyhow::anyhow!("directory offline"))
        }
    }

    fn admins() -> StaticAdminDirectory {
        StaticAdminDirectory(vec!["root".to_string(), "u1".to_string()])
    }

    #[rocket::async_test]
    async fn missing_token_is_unauthorized() {
        let err = authorize(None, &admins()).await.unwrap_err();
        assert_eq!(err.status(), Status::Unauthorized);

        let err = authorize(Some(""), &admins()).await.unwrap_err();
        assert_eq!(err.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn unknown_token_is_forbidden() {
        let err = authorize(Some("guest"), &admins()).await.unwrap_err();
        assert_eq!(err.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn listed_token_passes() {
        assert!(authorize(Some("u1"), &admins()).await.is_ok());
    }

    #[rocket::async_test]
    async fn missing_token_skips_lookup() {
        // BrokenDirectory would turn this into a 500 if it were consulted.
        let err = authorize(None, &BrokenDirectory).await.unwrap_err();
        assert_eq!(err.status(), Status::Unauthorized);
    }

    #[rocket::async_test]
    async fn failed_lookup_is_internal() {
        let err = authorize(Some("root"), &BrokenDirectory).await.unwrap_err();
        assert_eq!(err.status(), Status::InternalServerError);
        assert!(err.to_string().contains("directory offline"));
    }

    #[rocket::async_test]
    async fn file_directory_reads_json_list() {
        let path = std::env::temp_dir().join(format!("notes-admins-{}.json", std::process::id()));
        std::fs::write(&path, r#"["root", "u1"]"#).unwrap();

        let directory = FileAdminDirectory::new(&path);
        assert_eq!(directory.admins().await.unwrap(), vec!["root", "u1"]);

        std::fs::write(&path, "not json").unwrap();
        assert!(directory.admins().await.is_err());

        std::fs::remove_file(&path).unwrap();
        assert!(directory.admins().await.is_err());
    }
}
