//! SQL filters available inside `${...}` substitutions
//!
//! Literal substitution splices text straight into the statement, so these
//! filters are how a template quotes what it interpolates:
//! `ORDER BY ${ column | identifier }`.

use minijinja::{Environment, Value};

/// SQL-specific filters
pub struct SqlFilters;

impl SqlFilters {
    /// Quote a string for SQL
    pub fn sqlquote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Render a parenthesized, comma-separated list of literals
    pub fn inclause(values: Vec<Value>) -> String {
        let items: Vec<String> = values
            .iter()
            .map(|v| match v.as_str() {
                Some(s) => Self::sqlquote(s),
                None if v.is_none() || v.is_undefined() => "NULL".to_string(),
                None => v.to_string(),
            })
            .collect();

        format!("({})", items.join(", "))
    }

    /// Quote an identifier (table/column name)
    pub fn identifier(value: &str) -> String {
        value
            .split('.')
            .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Escape `%`, `_` and `\` for use inside a LIKE pattern
    pub fn escape_like(value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            if matches!(c, '%' | '_' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }
}

/// Register all SQL filters with a MiniJinja environment
pub fn register_filters(env: &mut Environment) {
    env.add_filter("sqlquote", |value: String| SqlFilters::sqlquote(&value));
    env.add_filter("inclause", SqlFilters::inclause);
    env.add_filter("identifier", |value: String| SqlFilters::identifier(&value));
    env.add_filter("escape_like", |value: String| SqlFilters::escape_like(&value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlquote() {
        assert_eq!(SqlFilters::sqlquote("hello"), "'hello'");
        assert_eq!(SqlFilters::sqlquote("it's"), "'it''s'");
    }

    #[test]
    fn test_identifier() {
        assert_eq!(SqlFilters::identifier("users"), "\"users\"");
        assert_eq!(SqlFilters::identifier("user\"name"), "\"user\"\"name\"");
        assert_eq!(SqlFilters::identifier("app.users"), "\"app\".\"users\"");
    }

    #[test]
    fn test_inclause() {
        let values = vec![Value::from(1), Value::from("o'k"), Value::from(())];
        assert_eq!(SqlFilters::inclause(values), "(1, 'o''k', NULL)");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(SqlFilters::escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
