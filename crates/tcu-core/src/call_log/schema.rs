//! DDL and statements for the call log table, per backend
//!
//! The `any` driver passes SQL through untouched, so placeholders and
//! auto-increment syntax are rendered here for each backend. Table names come
//! from a validated prefix and are interpolated directly.

use crate::config::DatabaseDriver;

/// Columns of the call log table, in insert order for [`Statements::insert`]
pub const INSERT_COLUMNS: [&str; 7] = [
    "endpoint",
    "method",
    "request_body",
    "request_size",
    "request_headers",
    "client_identity",
    "status",
];

/// Bind placeholder for the `n`th parameter (1-based)
pub fn placeholder(driver: DatabaseDriver, n: usize) -> String {
    match driver {
        DatabaseDriver::Postgres => format!("${}", n),
        DatabaseDriver::Mysql | DatabaseDriver::Sqlite => "?".to_string(),
    }
}

fn placeholders(driver: DatabaseDriver, from: usize, count: usize) -> Vec<String> {
    (from..from + count).map(|n| placeholder(driver, n)).collect()
}

/// `CREATE TABLE IF NOT EXISTS` for the call log table
pub fn create_table(driver: DatabaseDriver, table: &str) -> String {
    let (id, text, float, timestamp) = match driver {
        DatabaseDriver::Mysql => (
            "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY",
            "LONGTEXT",
            "DOUBLE",
            "TIMESTAMP NULL",
        ),
        DatabaseDriver::Postgres => ("BIGSERIAL PRIMARY KEY", "TEXT", "DOUBLE PRECISION", "TIMESTAMP"),
        DatabaseDriver::Sqlite => ("INTEGER PRIMARY KEY AUTOINCREMENT", "TEXT", "REAL", "TIMESTAMP"),
    };
    let short = match driver {
        DatabaseDriver::Mysql => "VARCHAR(255)",
        _ => "TEXT",
    };

    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
         id {id}, \
         endpoint {short} NOT NULL, \
         method VARCHAR(10) NOT NULL, \
         request_body {text}, \
         request_size BIGINT, \
         request_headers {text}, \
         client_identity {short}, \
         response_body {text}, \
         response_size BIGINT, \
         status_code BIGINT, \
         execution_time {float}, \
         response_headers {text}, \
         error_message {text}, \
         error_code VARCHAR(64), \
         status VARCHAR(16) NOT NULL, \
         created_at {timestamp} DEFAULT CURRENT_TIMESTAMP, \
         updated_at {timestamp} DEFAULT NULL)"
    )
}

/// Prepared SQL text for one table and backend
#[derive(Debug, Clone)]
pub struct Statements {
    pub insert: String,
    pub update_success: String,
    pub update_error: String,
    pub select: String,
}

impl Statements {
    pub fn new(driver: DatabaseDriver, table: &str) -> Self {
        let mut insert = format!(
            "INSERT INTO {} ({}, created_at) VALUES ({}, CURRENT_TIMESTAMP)",
            table,
            INSERT_COLUMNS.join(", "),
            placeholders(driver, 1, INSERT_COLUMNS.len()).join(", ")
        );
        if driver != DatabaseDriver::Mysql {
            insert.push_str(" RETURNING id");
        }

        let p = |n| placeholder(driver, n);
        let update_success = format!(
            "UPDATE {} SET status_code = {}, response_headers = {}, response_body = {}, \
             response_size = {}, execution_time = {}, status = {}, updated_at = CURRENT_TIMESTAMP \
             WHERE id = {} AND status = {}",
            table,
            p(1),
            p(2),
            p(3),
            p(4),
            p(5),
            p(6),
            p(7),
            p(8)
        );
        let update_error = format!(
            "UPDATE {} SET status_code = {}, execution_time = {}, error_message = {}, error_code = {}, \
             response_body = {}, response_size = {}, status = {}, updated_at = CURRENT_TIMESTAMP \
             WHERE id = {} AND status = {}",
            table,
            p(1),
            p(2),
            p(3),
            p(4),
            p(5),
            p(6),
            p(7),
            p(8),
            p(9)
        );
        let select = format!(
            "SELECT id, endpoint, method, request_body, request_size, request_headers, client_identity, \
             response_body, response_size, status_code, execution_time, response_headers, \
             error_message, error_code, status FROM {} WHERE id = {}",
            table,
            p(1)
        );

        Self {
            insert,
            update_success,
            update_error,
            select,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_per_driver() {
        assert_eq!(placeholder(DatabaseDriver::Postgres, 3), "$3");
        assert_eq!(placeholder(DatabaseDriver::Mysql, 3), "?");
        assert_eq!(placeholder(DatabaseDriver::Sqlite, 1), "?");
    }

    #[test]
    fn test_insert_returns_id_where_supported() {
        let pg = Statements::new(DatabaseDriver::Postgres, "tcu_api_logs");
        assert!(pg.insert.ends_with("RETURNING id"));
        assert!(pg.insert.contains("$7"));

        let mysql = Statements::new(DatabaseDriver::Mysql, "tcu_api_logs");
        assert!(!mysql.insert.contains("RETURNING"));
        assert!(!mysql.insert.contains('$'));
    }

    #[test]
    fn test_updates_only_touch_started_records() {
        let statements = Statements::new(DatabaseDriver::Sqlite, "uni_tcu_api_logs");
        assert!(statements.update_success.starts_with("UPDATE uni_tcu_api_logs"));
        assert!(statements.update_success.contains("WHERE id = ? AND status = ?"));
        assert!(statements.update_error.contains("WHERE id = ? AND status = ?"));
    }

    #[test]
    fn test_create_table_per_driver() {
        assert!(create_table(DatabaseDriver::Mysql, "t").contains("AUTO_INCREMENT"));
        assert!(create_table(DatabaseDriver::Postgres, "t").contains("BIGSERIAL"));
        let sqlite = create_table(DatabaseDriver::Sqlite, "t");
        assert!(sqlite.starts_with("CREATE TABLE IF NOT EXISTS t ("));
        assert!(sqlite.contains("AUTOINCREMENT"));
    }
}
