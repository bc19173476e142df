//! Placeholder style conversion
//!
//! Generated SQL uses positional `?` placeholders. PostgreSQL expects
//! numbered `$1, $2, ...` parameters instead.

/// Rewrite `?` placeholders to `$n`, starting at `$1`
///
/// `?` characters inside single-quoted literals or double-quoted
/// identifiers are left untouched. Every other `?` is a placeholder; write
/// `??` for a literal `?`, such as the jsonb key-exists operator.
///
/// # Example
/// ```
/// use runtara_bo_dao::sql::placeholder::to_numbered;
///
/// assert_eq!(
///     to_numbered("UPDATE t SET a=?,b=? WHERE id=?"),
///     "UPDATE t SET a=$1,b=$2 WHERE id=$3"
/// );
/// assert_eq!(to_numbered("SELECT * FROM t WHERE doc ?? ?"), "SELECT * FROM t WHERE doc ? $1");
/// ```
pub fn to_numbered(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut param = 0usize;
    scan(sql, |c, is_placeholder| {
        if is_placeholder {
            param += 1;
            out.push('$');
            out.push_str(&param.to_string());
        } else {
            out.push(c);
        }
    });
    out
}

/// Count `?` placeholders outside quoted text; `??` is not a placeholder
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    scan(sql, |_, is_placeholder| count += usize::from(is_placeholder));
    count
}

/// Walk `sql`, flagging each character that is a bindable `?`
///
/// An unquoted `??` is reported once, as a plain `?`.
fn scan(sql: &str, mut visit: impl FnMut(char, bool)) {
    let mut in_literal = false;
    let mut in_identifier = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_identifier => in_literal = !in_literal,
            '"' if !in_literal => in_identifier = !in_identifier,
            '?' if !in_literal && !in_identifier => {
                let escaped = chars.next_if_eq(&'?').is_some();
                visit(c, !escaped);
                continue;
            }
            _ => {}
        }
        visit(c, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_numbered_simple() {
        assert_eq!(
            to_numbered("SELECT a,b FROM t WHERE a=? AND b=?"),
            "SELECT a,b FROM t WHERE a=$1 AND b=$2"
        );
    }

    #[test]
    fn test_to_numbered_no_placeholders() {
        assert_eq!(to_numbered("SELECT a FROM t ORDER BY a"), "SELECT a FROM t ORDER BY a");
    }

    #[test]
    fn test_to_numbered_skips_quoted_text() {
        assert_eq!(
            to_numbered("SELECT '?' AS q, \"we?ird\" FROM t WHERE a = ?"),
            "SELECT '?' AS q, \"we?ird\" FROM t WHERE a = $1"
        );
    }

    #[test]
    fn test_to_numbered_escaped_quote_in_literal() {
        assert_eq!(
            to_numbered("SELECT 'it''s ?' FROM t WHERE a = ? AND b = ?"),
            "SELECT 'it''s ?' FROM t WHERE a = $1 AND b = $2"
        );
    }

    #[test]
    fn test_to_numbered_many_params() {
        let sql = format!("INSERT INTO t VALUES ({})", vec!["?"; 12].join(","));
        let numbered = to_numbered(&sql);
        assert!(numbered.ends_with("$11,$12)"));
    }

    #[test]
    fn test_to_numbered_double_question_mark_is_literal() {
        assert_eq!(
            to_numbered("SELECT * FROM t WHERE tags ?? ? AND id = ?"),
            "SELECT * FROM t WHERE tags ? $1 AND id = $2"
        );
        assert_eq!(to_numbered("SELECT 'a??' FROM t"), "SELECT 'a??' FROM t");
    }

    #[test]
    fn test_count_placeholders_ignores_escaped_question_mark() {
        assert_eq!(count_placeholders("tags ?? ? AND tags ??| ?"), 2);
        assert_eq!(count_placeholders("a ??"), 0);
    }

    #[test]
    fn test_count_placeholders() {
        assert_eq!(count_placeholders("a=? AND b='?' AND c=?"), 2);
        assert_eq!(count_placeholders("SELECT 1"), 0);
    }
}
