//! `LIKE` pattern escaping.
//!
//! Escaping is idempotent: a backslash that already precedes a wildcard or
//! another backslash is taken as an escape and kept, so escaping an escaped
//! pattern changes nothing.

use crate::query::capabilities::DialectCapabilities;

pub const ESCAPE_CHAR: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapedPattern {
    pub text: String,

    /// The pattern contains escapes, so the statement needs an `ESCAPE`
    /// clause.
    pub needs_escape_clause: bool,
}

pub fn escape_like(value: &str, caps: &DialectCapabilities) -> EscapedPattern {
    let chars: Vec<char> = value.chars().collect();
    let is_escapable = |c: char| c == ESCAPE_CHAR || caps.is_reserved_wildcard(c);

    let mut needs_escape = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ESCAPE_CHAR {
            match chars.get(i + 1) {
                Some(&next) if is_escapable(next) => {
                    needs_escape = true;
                    i += 2;
                    continue;
                }
                _ => needs_escape |= caps.backslash_escape_required,
            }
        } else if caps.is_reserved_wildcard(c) {
            needs_escape = true;
        }
        i += 1;
    }

    if !needs_escape {
        return EscapedPattern {
            text: value.to_string(),
            needs_escape_clause: false,
        };
    }

    let mut text = String::with_capacity(value.len() + 4);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ESCAPE_CHAR {
            match chars.get(i + 1) {
                Some(&next) if is_escapable(next) => {
                    text.push(c);
                    text.push(next);
                    i += 2;
                    continue;
                }
                _ => {
                    text.push(ESCAPE_CHAR);
                    text.push(ESCAPE_CHAR);
                }
            }
        } else if caps.is_reserved_wildcard(c) {
            text.push(ESCAPE_CHAR);
            text.push(c);
        } else {
            text.push(c);
        }
        i += 1;
    }

    EscapedPattern {
        text,
        needs_escape_clause: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::capabilities::BackendKind;

    fn caps(kind: BackendKind) -> DialectCapabilities {
        DialectCapabilities::for_backend(&kind).unwrap()
    }

    /// True if some reserved wildcard in `text` is not preceded by an escape.
    fn has_unescaped_wildcard(text: &str, caps: &DialectCapabilities) -> bool {
        let mut escaped = false;
        for c in text.chars() {
            if escaped {
                escaped = false;
            } else if c == ESCAPE_CHAR {
                escaped = true;
            } else if caps.is_reserved_wildcard(c) {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_plain_value_is_untouched() {
        let escaped = escape_like("Smith", &caps(BackendKind::Postgres));
        assert_eq!(escaped.text, "Smith");
        assert!(!escaped.needs_escape_clause);
    }

    #[test]
    fn test_wildcards_are_escaped() {
        let escaped = escape_like("50%_off", &caps(BackendKind::Postgres));
        assert_eq!(escaped.text, r"50\%\_off");
        assert!(escaped.needs_escape_clause);

        let sql_server = escape_like("[a]", &caps(BackendKind::SqlServer));
        assert_eq!(sql_server.text, r"\[a]");

        let oracle = escape_like("[a]", &caps(BackendKind::Oracle));
        assert_eq!(oracle.text, "[a]");
        assert!(!oracle.needs_escape_clause);
    }

    #[test]
    fn test_lone_backslash() {
        let mysql = escape_like(r"C:\dir", &caps(BackendKind::MySql));
        assert_eq!(mysql.text, r"C:\\dir");
        assert!(mysql.needs_escape_clause);

        // Oracle has no default escape character.
        let oracle = escape_like(r"C:\dir", &caps(BackendKind::Oracle));
        assert_eq!(oracle.text, r"C:\dir");
        assert!(!oracle.needs_escape_clause);

        let oracle = escape_like(r"C:\dir_1", &caps(BackendKind::Oracle));
        assert_eq!(oracle.text, r"C:\\dir\_1");
    }

    #[test]
    fn test_escaping_is_idempotent() {
        for kind in [
            BackendKind::Postgres,
            BackendKind::MySql,
            BackendKind::SqlServer,
            BackendKind::Oracle,
            BackendKind::Db2,
            BackendKind::Sqlite,
        ] {
            let caps = caps(kind);
            for input in ["100%", "a_b", r"x\y", r"x\%y", "[x]%", r"trailing\", "plain"] {
                let once = escape_like(input, &caps);
                let twice = escape_like(&once.text, &caps);
                assert_eq!(once.text, twice.text, "input {input:?}");
                assert!(!has_unescaped_wildcard(&once.text, &caps), "input {input:?}");
            }
        }
    }
}
