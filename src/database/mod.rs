use derive_new::new;
use serde::Deserialize;
use snafu::{Location, ResultExt, Snafu};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use url::Url;

/// Helper for executing arbitrary SurrealQL queries.
pub mod query;

/// Macros for defining table methods.
pub mod macros;

pub mod record;

pub use query::{Bindings, DatabaseQueryError};
pub use record::Record;
pub use surrealdb::sql::Thing;

const SCHEMA: &str = include_str!("../../schema.surrealql");

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatabaseError {
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    Connect {
        url: Url,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot sign in to `{url}` as `{username}` at {location}: {source}"))]
    SignIn {
        url: Url,
        username: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "cannot use namespace `{namespace}` and database `{database}` at {location}: {source}"
    ))]
    UseDatabase {
        namespace: String,
        database: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to apply the database schema at {location}: {source}"))]
    ApplySchema {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

/// A model stored in its own table.
pub trait Table {
    /// Returns the name of the table associated with the record.
    fn table() -> &'static str;
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url", default = "default_url")]
    pub url: Url,
    #[serde(rename = "surreal_ns", default = "default_name")]
    pub namespace: String,
    #[serde(rename = "surreal_db", default = "default_name")]
    pub database: String,
    #[serde(rename = "surreal_username", default)]
    pub username: Option<String>,
    #[serde(rename = "surreal_password", default)]
    pub password: Option<String>,
}

fn default_url() -> Url {
    Url::parse("mem://").expect("static url is valid")
}

fn default_name() -> String {
    "wetube".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            namespace: default_name(),
            database: default_name(),
            username: None,
            password: None,
        }
    }
}

impl DatabaseConfig {
    fn credentials(&self) -> Option<Root<'_>> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Root { username, password }),
            _ => None,
        }
    }
}

/// A cloneable handle to the document store.
#[derive(Debug, Clone, new)]
pub struct Database {
    inner: Surreal<Any>,
}

impl Database {
    /// Connects to the configured endpoint, selects the namespace and database, then applies
    /// `schema.surrealql`. Any engine supported by [surrealdb::engine::any] works, `mem://`
    /// gives a fresh in-memory store on every call.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = &config.url;
        let db = surrealdb::engine::any::connect(url.as_str())
            .await
            .context(ConnectSnafu { url: url.clone() })?;

        if let Some(credentials) = config.credentials() {
            let username = credentials.username.to_string();
            db.signin(credentials)
                .await
                .context(SignInSnafu { url: url.clone(), username })?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .context(UseDatabaseSnafu {
                namespace: &config.namespace,
                database: &config.database,
            })?;

        db.query(SCHEMA)
            .await
            .and_then(surrealdb::Response::check)
            .context(ApplySchemaSnafu)?;

        tracing::info!(%url, namespace = %config.namespace, database = %config.database, "connected to the database");

        Ok(Database::new(db))
    }

    /// Create a builder to execute arbitrary SQL code on the database.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let videos: Vec<Video> = db
    ///     .sql("SELECT * FROM videos WHERE creator = $creator ORDER BY id DESC")
    ///     .bind(("creator", &user.id))
    ///     .fetch_first()
    ///     .await?;
    /// ```
    ///
    /// `fetch_first` can deserialize the result into either a single value (`Option<T>`) or a collection of values (`Vec<T>`).
    pub fn sql(&self, query: &str) -> Bindings<'_> {
        Bindings::new(self.inner.query(query))
    }
}
