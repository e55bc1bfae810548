//! Static classification of SQL text as production-safe or not.
//!
//! The verdict is a keyword heuristic over the upper-cased text, not a parser:
//! any blocked keyword anywhere rejects the statement, and the text must
//! contain at least one allowed operation. A sqlparser pass runs afterwards and
//! only contributes advisory warnings; it never changes `valid`.

use crate::models::SafetyVerdict;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Keywords that reject a statement wherever they appear.
pub const BLOCKED_KEYWORDS: [&str; 8] = [
    "DROP",
    "DELETE",
    "TRUNCATE",
    "ALTER",
    "UPDATE",
    "VACUUM FULL",
    "REINDEX",
    "CLUSTER",
];

/// A statement must contain one of these to be accepted.
pub const ALLOWED_OPERATIONS: [&str; 5] = [
    "CREATE INDEX CONCURRENTLY",
    "ANALYZE",
    "VACUUM",
    "SELECT",
    "EXPLAIN",
];

/// Classify `sql` without executing it.
///
/// # Examples
///
/// ```
/// use dbops_mcp_server::actions::sql_safety::validate_sql;
///
/// assert!(validate_sql("SELECT 1").valid);
/// assert!(validate_sql("ANALYZE orders").valid);
/// assert!(!validate_sql("DROP TABLE orders").valid);
/// assert!(!validate_sql("   ").valid);
/// ```
pub fn validate_sql(sql: &str) -> SafetyVerdict {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return SafetyVerdict {
            valid: false,
            reason: "Empty SQL query provided".to_string(),
            matched_keyword: None,
            warnings: Vec::new(),
        };
    }

    let upper = trimmed.to_uppercase();
    let warnings = parser_warnings(trimmed);

    if let Some(keyword) = BLOCKED_KEYWORDS.iter().find(|k| upper.contains(*k)) {
        return SafetyVerdict {
            valid: false,
            reason: format!(
                "Dangerous operation detected: {keyword}. Only production-safe operations are allowed"
            ),
            matched_keyword: Some(keyword.to_string()),
            warnings,
        };
    }

    match ALLOWED_OPERATIONS.iter().find(|op| upper.contains(*op)) {
        Some(op) => SafetyVerdict {
            valid: true,
            reason: "SQL appears safe for production use".to_string(),
            matched_keyword: Some(op.to_string()),
            warnings,
        },
        None => SafetyVerdict {
            valid: false,
            reason: format!(
                "Operation not in allowed list. Allowed operations: {}",
                ALLOWED_OPERATIONS.join(", ")
            ),
            matched_keyword: None,
            warnings,
        },
    }
}

fn parser_warnings(sql: &str) -> Vec<String> {
    match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(statements) if statements.len() > 1 => vec![format!(
            "Text contains {} statements; each statement should be reviewed separately",
            statements.len()
        )],
        Ok(statements) if statements.is_empty() => {
            vec!["Text contains no SQL statement".to_string()]
        }
        Ok(_) => Vec::new(),
        Err(e) => vec![format!("SQL could not be parsed: {e}")],
    }
}
