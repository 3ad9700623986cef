//! Placeholder discovery in logical paragraph text
//!
//! A placeholder style is a prefix/suffix delimiter pair. Matching is lazy,
//! dot-all (the inner content may span lines) and non-overlapping: each
//! search resumes right after the previous match.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Prefix/suffix pair delimiting a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Delimiters {
    pub prefix: String,
    pub suffix: String,
}

impl Delimiters {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// `${...}`: inline value placeholders
    pub fn value() -> Self {
        Self::new("${", "}")
    }

    /// `#{...}`: inline processor calls
    pub fn processor() -> Self {
        Self::new("#{", "}")
    }
}

/// A placeholder found in text, delimiters included
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder {
    prefix: String,
    suffix: String,
    expression: String,
}

impl Placeholder {
    /// `expression` is the full delimited text, e.g. `${name}`
    pub fn new(
        prefix: impl Into<String>,
        suffix: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            expression: expression.into(),
        }
    }

    /// A placeholder without delimiters, used for annotation expressions
    pub fn bare(expression: impl Into<String>) -> Self {
        Self::new("", "", expression)
    }

    /// Raw text as it appears in the document
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Inner content with the delimiters stripped
    pub fn content(&self) -> &str {
        let inner = self.expression.strip_prefix(self.prefix.as_str()).unwrap_or(&self.expression);
        inner.strip_suffix(self.suffix.as_str()).unwrap_or(inner)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expression)
    }
}

/// Compiled matcher for one delimiter style
#[derive(Debug, Clone)]
pub struct PlaceholderStyle {
    delimiters: Delimiters,
    pattern: Regex,
}

static VALUE_STYLE: Lazy<PlaceholderStyle> = Lazy::new(|| {
    PlaceholderStyle::new(Delimiters::value()).expect("value placeholder pattern is valid")
});

static PROCESSOR_STYLE: Lazy<PlaceholderStyle> = Lazy::new(|| {
    PlaceholderStyle::new(Delimiters::processor()).expect("processor placeholder pattern is valid")
});

impl PlaceholderStyle {
    pub fn new(delimiters: Delimiters) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"(?s){}(.*?){}",
            regex::escape(&delimiters.prefix),
            regex::escape(&delimiters.suffix)
        ))?;
        Ok(Self {
            delimiters,
            pattern,
        })
    }

    /// The `${...}` style
    pub fn value() -> Self {
        VALUE_STYLE.clone()
    }

    /// The `#{...}` style
    pub fn processor() -> Self {
        PROCESSOR_STYLE.clone()
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// All placeholders in `text`, in order of appearance
    pub fn find(&self, text: &str) -> Vec<Placeholder> {
        if text.is_empty() {
            return Vec::new();
        }
        self.pattern
            .find_iter(text)
            .map(|m| {
                Placeholder::new(
                    self.delimiters.prefix.clone(),
                    self.delimiters.suffix.clone(),
                    m.as_str(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contents(style: &PlaceholderStyle, text: &str) -> Vec<String> {
        style.find(text).iter().map(|p| p.content().to_string()).collect()
    }

    #[test]
    fn test_find_value_placeholders() {
        let found = PlaceholderStyle::value().find("Hello ${name}, you owe ${amount}.");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].expression(), "${name}");
        assert_eq!(found[0].content(), "name");
        assert_eq!(found[1].content(), "amount");
    }

    #[test]
    fn test_styles_do_not_cross_match() {
        let text = "${a} #{b()}";
        assert_eq!(contents(&PlaceholderStyle::value(), text), vec!["a"]);
        assert_eq!(contents(&PlaceholderStyle::processor(), text), vec!["b()"]);
    }

    #[test]
    fn test_content_spans_lines() {
        let found = PlaceholderStyle::value().find("${first\nsecond}");
        assert_eq!(found[0].content(), "first\nsecond");
    }

    #[test]
    fn test_matches_do_not_overlap() {
        // The lazy match ends at the first suffix; the rest is plain text.
        assert_eq!(contents(&PlaceholderStyle::value(), "${a${b}c}"), vec!["a${b"]);
        assert_eq!(contents(&PlaceholderStyle::value(), "${}${x}"), vec!["", "x"]);
    }

    #[test]
    fn test_empty_and_unterminated_input() {
        assert!(PlaceholderStyle::value().find("").is_empty());
        assert!(PlaceholderStyle::value().find("${never closed").is_empty());
    }

    #[test]
    fn test_custom_delimiters_are_escaped() {
        let style = PlaceholderStyle::new(Delimiters::new("[[", "]]")).unwrap();
        assert_eq!(contents(&style, "a [[x.y]] b [[z]]"), vec!["x.y", "z"]);
        assert!(style.find("${x}").is_empty());
    }

    #[test]
    fn test_bare_placeholder_content_is_whole_text() {
        let p = Placeholder::bare("hide()");
        assert_eq!(p.content(), "hide()");
        assert_eq!(p.expression(), "hide()");
    }
}
