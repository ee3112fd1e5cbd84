//! Query templates with `{{name}}` parameters.
//!
//! The template text is sent to the service verbatim; the service substitutes
//! the bound values. The client only needs to know which parameters a
//! template expects, so that it can bind positional arguments to them.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Serialize, ser::SerializeMap as _};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// An error encountered while parsing a template or binding its parameters.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A `{{` had no matching `}}` after it.
    #[error("syntax error at idx {position}: `}}}}` not found")]
    Unclosed {
        /// Byte offset of the unmatched `{{`.
        position: usize,
    },
    /// The number of arguments did not match the number of parameters.
    #[error("argument error, expected {expected:?}, got {actual:?}")]
    Arity {
        /// The template's parameters, one per occurrence.
        expected: Vec<String>,
        /// The arguments supplied.
        actual: Vec<String>,
    },
    /// The query file could not be read.
    #[error("failed to read file {}", path.display())]
    Io {
        /// The path that was read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A parsed query template.
///
/// Every `{{...}}` occurrence in the text has exactly one entry in
/// [`Query::parameters`], in order of appearance. Names repeat if the template
/// repeats them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    parameters: Vec<String>,
}

impl Query {
    /// Parse a template, extracting its parameter names.
    pub fn parse(text: impl Into<String>) -> Result<Self, QueryError> {
        let text = text.into();
        let parameters = parse_parameters(&text)?;
        Ok(Self { text, parameters })
    }

    /// Read and parse a template from a file. A leading `#!` line is dropped,
    /// so query files can be made executable.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| QueryError::Io {
            path: path.to_owned(),
            source,
        })?;

        Self::parse(strip_shebang(&content))
    }

    /// The template text, exactly as it will be submitted.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The parameter names, one per occurrence.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Bind positional arguments to the template's parameters. There must be
    /// exactly one argument per parameter occurrence.
    pub fn bind<S: AsRef<str>>(&self, args: &[S]) -> Result<Binding, QueryError> {
        if args.len() != self.parameters.len() {
            return Err(QueryError::Arity {
                expected: self.parameters.clone(),
                actual: args.iter().map(|s| s.as_ref().to_owned()).collect(),
            });
        }

        let mut binding = Binding::default();
        for (name, value) in self.parameters.iter().zip(args) {
            binding.insert(name, value.as_ref());
        }

        Ok(binding)
    }

    /// A short description of the expected arguments, like `<id> <name>`.
    pub fn usage(&self) -> String {
        if self.parameters.is_empty() {
            return "this query has no parameter".to_string();
        }

        self.parameters
            .iter()
            .map(|p| format!("<{p}>"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parameter values bound to a query, keyed by parameter name. Serializes as
/// a JSON object.
///
/// Entries keep the order in which their names first appear in the template.
/// A name that occurs more than once takes the value of its last occurrence.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Binding(Vec<(String, String)>);

impl Binding {
    fn insert(&mut self, name: &str, value: &str) {
        if let Some((_, v)) = self.0.iter_mut().find(|(n, _)| n == name) {
            *v = value.to_owned();
        } else {
            self.0.push((name.to_owned(), value.to_owned()));
        }
    }

    /// The value bound to a name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the bound names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The number of distinct names bound.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Binding {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn parse_parameters(text: &str) -> Result<Vec<String>, QueryError> {
    let mut parameters = Vec::new();
    let mut pos = 0;

    while let Some(open) = text[pos..].find(OPEN) {
        let open = pos + open;
        let start = open + OPEN.len();
        let Some(len) = text[start..].find(CLOSE) else {
            return Err(QueryError::Unclosed { position: open });
        };

        parameters.push(text[start..start + len].trim().to_owned());
        pos = start + len + CLOSE.len();
    }

    Ok(parameters)
}

/// Drops the first line if it is a shebang.
fn strip_shebang(content: &str) -> &str {
    if !content.starts_with("#!") {
        return content;
    }

    match content.split_once('\n') {
        Some((_, rest)) => rest,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn no_parameters() -> anyhow::Result<()> {
        let text = "select * from users limit 10";
        let q = Query::parse(text)?;

        assert!(q.parameters().is_empty());
        assert_eq!(q.text(), text);
        assert_eq!(q.usage(), "this query has no parameter");
        Ok(())
    }

    #[test]
    fn parameters_in_order() -> anyhow::Result<()> {
        let q = Query::parse("select * from t where id={{id}} and name={{ name }}")?;

        assert_eq!(q.parameters(), ["id", "name"]);
        assert_eq!(q.usage(), "<id> <name>");
        Ok(())
    }

    #[test]
    fn duplicates_are_kept() -> anyhow::Result<()> {
        let q = Query::parse("select {{a}}, {{b}}, {{a}}")?;
        assert_eq!(q.parameters(), ["a", "b", "a"]);
        Ok(())
    }

    #[test]
    fn adjacent_parameters() -> anyhow::Result<()> {
        let q = Query::parse("{{x}}{{y}}")?;
        assert_eq!(q.parameters(), ["x", "y"]);
        Ok(())
    }

    #[test]
    fn unclosed_parameter() {
        assert_matches!(
            Query::parse("a {{b"),
            Err(QueryError::Unclosed { position: 2 })
        );
    }

    #[test]
    fn unclosed_after_valid_parameter() {
        assert_matches!(
            Query::parse("{{a}} and {{b"),
            Err(QueryError::Unclosed { position: 10 })
        );
    }

    #[test]
    fn closing_before_opening() -> anyhow::Result<()> {
        let q = Query::parse("a }} b")?;
        assert!(q.parameters().is_empty());

        // The `}}` before the `{{` does not close it.
        let q = Query::parse("x }} {{y}}")?;
        assert_eq!(q.parameters(), ["y"]);
        Ok(())
    }

    #[test]
    fn bind_arity_mismatch() -> anyhow::Result<()> {
        let q = Query::parse("{{a}} {{b}} {{c}}")?;

        let err = q.bind(&["1", "2"]).unwrap_err();
        assert_matches!(&err, QueryError::Arity { expected, actual }
            if expected.len() == 3 && actual.len() == 2);
        assert_eq!(
            err.to_string(),
            r#"argument error, expected ["a", "b", "c"], got ["1", "2"]"#
        );
        Ok(())
    }

    #[test]
    fn bind_positional() -> anyhow::Result<()> {
        let q = Query::parse("{{b}} {{a}}")?;
        let binding = q.bind(&["first", "second"])?;

        assert_eq!(binding.get("b"), Some("first"));
        assert_eq!(binding.get("a"), Some("second"));
        assert_eq!(
            binding.iter().collect::<Vec<_>>(),
            [("b", "first"), ("a", "second")]
        );
        Ok(())
    }

    #[test]
    fn bind_duplicates_need_one_argument_each() -> anyhow::Result<()> {
        let q = Query::parse("{{a}} {{a}}")?;

        assert!(q.bind(&["1"]).is_err());

        let binding = q.bind(&["1", "2"])?;
        assert_eq!(binding.len(), 1);
        assert_eq!(binding.get("a"), Some("2"));
        Ok(())
    }

    #[test]
    fn binding_serializes_as_object() -> anyhow::Result<()> {
        let q = Query::parse("{{id}} {{name}}")?;
        let binding = q.bind(&["1", "bob"])?;

        assert_eq!(
            serde_json::to_value(&binding)?,
            serde_json::json!({"id": "1", "name": "bob"})
        );
        Ok(())
    }

    #[test]
    fn shebang_is_stripped() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"#!/foo\nselect 1")?;

        let q = Query::from_file(file.path())?;
        assert_eq!(q, Query::parse("select 1")?);
        Ok(())
    }

    #[test]
    fn shebang_only() {
        assert_eq!(strip_shebang("#!/usr/bin/env redac"), "");
        assert_eq!(strip_shebang("select 1"), "select 1");
        assert_eq!(strip_shebang("select '#!'"), "select '#!'");
    }

    #[test]
    fn missing_file() {
        assert_matches!(
            Query::from_file("/definitely/not/here.sql"),
            Err(QueryError::Io { .. })
        );
    }
}
