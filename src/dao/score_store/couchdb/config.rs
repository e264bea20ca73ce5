use super::error::{CouchDaoError, CouchResult};

/// Runtime configuration describing how to reach the CouchDB score database.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server URL without the database path.
    pub base_url: String,
    /// Database holding score documents.
    pub database: String,
    /// Basic auth user.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
}

impl CouchConfig {
    /// Anonymous access to `database` on `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            username: None,
            password: None,
        }
    }

    /// Attach basic-auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Read `COUCH_BASE_URL`, `COUCH_DB` (defaults to `leaderboard`) and the
    /// optional `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        let base_url =
            std::env::var("COUCH_BASE_URL").map_err(|_| CouchDaoError::MissingEnvVar {
                var: "COUCH_BASE_URL",
            })?;
        let database = std::env::var("COUCH_DB").unwrap_or_else(|_| "leaderboard".to_owned());

        let mut config = Self::new(base_url, database);
        if let (Ok(username), Ok(password)) = (
            std::env::var("COUCH_USERNAME"),
            std::env::var("COUCH_PASSWORD"),
        ) {
            config = config.with_credentials(username, password);
        }
        Ok(config)
    }
}
