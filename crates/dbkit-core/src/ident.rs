//! Identifier validation and `?` marker scanning.

use crate::backend::Backend;

/// Returns `true` if `s` matches `^[A-Za-z][A-Za-z0-9_]*$`.
#[must_use]
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Splits `sql` around `?` markers that are outside quoted literals and
/// quoted identifiers.
///
/// On MySQL and MariaDB a backslash inside a string literal escapes the
/// next character, matching what [`Backend::escape_literal`] writes.
///
/// The result always has one more segment than there are markers.
#[must_use]
pub fn split_markers(backend: Backend, sql: &str) -> Vec<&str> {
    let backslashes = backend.is_mysql_family();
    let mut segments = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in sql.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(q) if c == '\\' && backslashes && q != '`' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '?' => {
                    segments.push(&sql[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    segments.push(&sql[start..]);
    segments
}

/// Counts `?` markers outside quotes.
#[must_use]
pub fn count_markers(backend: Backend, sql: &str) -> usize {
    split_markers(backend, sql).len() - 1
}

/// Rewrites `?` markers to PostgreSQL's numbered `$n` form.
#[must_use]
pub fn number_markers(sql: &str) -> String {
    let segments = split_markers(Backend::Postgres, sql);
    let mut out = String::with_capacity(sql.len() + segments.len() * 2);
    for (n, segment) in segments.iter().enumerate() {
        if n > 0 {
            out.push('$');
            out.push_str(&n.to_string());
        }
        out.push_str(segment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rule() {
        assert!(is_identifier("users"));
        assert!(is_identifier("u2_name"));
        assert!(!is_identifier("_users"));
        assert!(!is_identifier("1users"));
        assert!(!is_identifier("user-name"));
        assert!(!is_identifier("naïve"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_markers_skip_quotes() {
        let sqlite = Backend::Sqlite;
        assert_eq!(count_markers(sqlite, "a = ? AND b = '?' AND c = ?"), 2);
        assert_eq!(count_markers(sqlite, "\"what?\" = 1"), 0);
        assert_eq!(count_markers(sqlite, "no markers"), 0);
        // doubled quotes stay inside the literal
        assert_eq!(count_markers(sqlite, "a = 'it''s?' AND b = ?"), 1);
    }

    #[test]
    fn test_markers_skip_mysql_backslash_escapes() {
        assert_eq!(count_markers(Backend::MySql, r"name = 'it\'s?'"), 0);
        assert_eq!(count_markers(Backend::MariaDb, r"a = 'x\\' AND b = ?"), 1);
        assert_eq!(count_markers(Backend::MySql, r#"a = "say \"why?\"" AND b = ?"#), 1);
        // backslashes are plain text in standard SQL strings
        assert_eq!(count_markers(Backend::Sqlite, r"a = 'x\' AND b = ?"), 1);
    }

    #[test]
    fn test_number_markers() {
        assert_eq!(
            number_markers("SELECT * FROM t WHERE a = ? AND b = '?' AND c IN (?, ?)"),
            "SELECT * FROM t WHERE a = $1 AND b = '?' AND c IN ($2, $3)"
        );
        assert_eq!(number_markers("SELECT 1"), "SELECT 1");
    }
}
