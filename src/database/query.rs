use derive_new::new;
use serde::de::DeserializeOwned;
use snafu::{Location, ResultExt, Snafu};
use surrealdb::opt::QueryResult;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatabaseQueryError {
    #[snafu(display("failed to execute the query at {location}: {source}"))]
    MalformedQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to deserialize the query result at {location}: {source}"))]
    Deserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

/// A query waiting for its parameters. Parameters can be bound using the [Bindings::bind] method which takes any serializable data structure.
///
/// # Example
/// ```ignore
/// let uploads: Vec<Video> = database.sql("SELECT * FROM videos WHERE creator = $user")
///     .bind(("user", &user.id))
///     .fetch_first()
///     .await?;
/// ```
#[derive(Debug, new)]
pub struct Bindings<'a> {
    query: surrealdb::method::Query<'a, surrealdb::engine::any::Any>,
}

impl Bindings<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Execute the query and return a [surrealdb::Response] which is SurrealDB's way to represent a list of statements returned from the database.
    ///
    /// Fails if any of the statements failed.
    pub async fn execute(self) -> Result<surrealdb::Response, DatabaseQueryError> {
        let response = self
            .query
            .await
            .and_then(surrealdb::Response::check)
            .context(MalformedQuerySnafu)?;
        tracing::debug!(?response, "executed query");
        Ok(response)
    }

    /// Execute the query and return the first result as a deserialized value.
    pub async fn fetch_first<T: DeserializeOwned>(self) -> Result<T, DatabaseQueryError>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        statements.take::<T>(0).context(DeserializeSnafu)
    }
}
