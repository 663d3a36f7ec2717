use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Error type for connection handling.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// No connection string was configured (empty `DB_URL`).
    #[error("no database connection string is configured")]
    Unconfigured,
    /// The underlying store rejected the connection attempt.
    #[error("failed to connect to the database: {0}")]
    Connect(#[from] sea_orm::DbErr),
}

/// Lazily-initialized shared handle to the database.
///
/// The first caller of [`Db::get`] triggers the connection attempt (including
/// schema migrations); concurrent callers await the same in-flight attempt.
/// A failed attempt leaves the cell empty so a later request can retry.
#[derive(Clone)]
pub struct Db {
    url: Arc<str>,
    conn: Arc<OnceCell<DatabaseConnection>>,
}

impl Db {
    /// Creates a handle for the given connection string without connecting.
    pub fn new(url: &str) -> Self {
        Self {
            url: Arc::from(url),
            conn: Arc::new(OnceCell::new()),
        }
    }

    /// Wraps an already-established connection. Used by tests.
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self {
            url: Arc::from(""),
            conn: Arc::new(OnceCell::new_with(Some(conn))),
        }
    }

    /// Returns the shared connection, establishing it on first use.
    pub async fn get(&self) -> Result<&DatabaseConnection, DbError> {
        self.conn
            .get_or_try_init(|| async {
                if self.url.is_empty() {
                    return Err(DbError::Unconfigured);
                }
                let conn = Database::connect(self.url.as_ref()).await?;
                migration::Migrator::up(&conn, None).await?;
                tracing::info!("database connection established, migrations applied");
                Ok(conn)
            })
            .await
    }
}
