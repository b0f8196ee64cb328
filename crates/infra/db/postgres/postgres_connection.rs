use anyhow::Result;
use diesel::{
    Connection, PgConnection, RunQueryDsl,
    connection::CacheSize,
    r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
    result::{DatabaseErrorKind, Error as DieselError},
};

use crate::domain::repositories::payment_orders::RowLockConflict;

/// How long a transaction waits for a row lock before giving up.
pub const ROW_LOCK_TIMEOUT: &str = "5s";

#[derive(Debug, Default)]
struct DisablePreparedStatements;

impl CustomizeConnection<PgConnection, R2d2Error> for DisablePreparedStatements {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.set_prepared_statement_cache_size(CacheSize::Disabled);
        Ok(())
    }
}

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

pub fn establish_connection(database_url: &str) -> Result<PgPoolSquad> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .connection_customizer(Box::new(DisablePreparedStatements))
        .build(manager)?;
    Ok(pool)
}

/// Bounds lock waits for the rest of the current transaction.
pub(crate) fn set_lock_timeout(conn: &mut PgConnection) -> Result<()> {
    diesel::sql_query(format!("SET LOCAL lock_timeout = '{ROW_LOCK_TIMEOUT}'")).execute(conn)?;
    Ok(())
}

/// Turns lock-wait failures into [`RowLockConflict`] so callers can tell contention
/// apart from other database errors.
pub(crate) fn lock_aware(error: DieselError) -> anyhow::Error {
    match &error {
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            anyhow::Error::new(RowLockConflict)
        }
        DieselError::DatabaseError(_, info) if info.message().contains("lock timeout") => {
            anyhow::Error::new(RowLockConflict)
        }
        _ => anyhow::Error::new(error),
    }
}

pub(crate) fn is_unique_violation(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}
