use funeral_hub_core::CoreError;

/// SQLSTATE codes that mean "try again later"
const CONTENTION_CODES: [&str; 3] = [
    "55P03", // lock_not_available
    "40P01", // deadlock_detected
    "40001", // serialization_failure
];

/// Map a sqlx error onto the core error model
pub fn map_sqlx_error(err: sqlx::Error, context: &str) -> CoreError {
    match &err {
        sqlx::Error::PoolTimedOut => {
            CoreError::Contention(format!("{}: no database connection available", context))
        }
        sqlx::Error::Database(db_err) => {
            let code = db_err.code();
            match code.as_deref() {
                Some(code) if CONTENTION_CODES.contains(&code) => {
                    CoreError::Contention(format!("{}: {}", context, db_err.message()))
                }
                _ => CoreError::Internal(format!("{}: {}", context, err)),
            }
        }
        _ => CoreError::Internal(format!("{}: {}", context, err)),
    }
}
