//! Page template loading and placeholder substitution.
//!
//! The entry page skeleton is a plain HTML file owned by the author (by
//! default `_template.html` in the source root). It contains a closed set of
//! literal tokens:
//!
//! | Token | Bound to |
//! |-------|----------|
//! | `{{ title }}` | entry title (HTML-escaped) |
//! | `{{ css }}` | stylesheet reference |
//! | `{{ content }}` | rendered entry body followed by the navigation block |
//! | `<!-- commentary -->` | commentary fragment |
//!
//! Substitution is one left-to-right pass over the template text. Bound
//! values are copied into the output and never rescanned, so an entry that
//! happens to contain `{{ title }}` prints it literally. A token with no
//! binding is left in place.
//!
//! [`stock_template`] is the template printed by `gen-template`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(PathBuf),
    #[error("Cannot read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Template is missing placeholders: {}", join_tokens(.0))]
    MissingPlaceholders(Vec<Placeholder>),
}

fn join_tokens(placeholders: &[Placeholder]) -> String {
    placeholders
        .iter()
        .map(|p| p.token())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A substitution point in the page template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    Title,
    Css,
    Content,
    Commentary,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::Title,
        Placeholder::Css,
        Placeholder::Content,
        Placeholder::Commentary,
    ];

    /// Literal token as it appears in the template.
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Title => "{{ title }}",
            Placeholder::Css => "{{ css }}",
            Placeholder::Content => "{{ content }}",
            Placeholder::Commentary => "<!-- commentary -->",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Values for one substitution pass.
#[derive(Debug, Clone, Default)]
pub struct Bindings(BTreeMap<Placeholder, String>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.0.insert(placeholder, value.into());
        self
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.0.get(&placeholder).map(String::as_str)
    }
}

/// Replace every occurrence of each bound token in `template`.
pub fn substitute(template: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        // Tokens share no prefix, so the earliest match is unambiguous
        let next = Placeholder::ALL
            .iter()
            .filter_map(|&p| {
                let value = bindings.get(p)?;
                rest.find(p.token()).map(|at| (at, p, value))
            })
            .min_by_key(|&(at, _, _)| at);

        match next {
            Some((at, placeholder, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + placeholder.token().len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// A loaded page template. Immutable for the duration of a build.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
}

impl Template {
    /// Read a template file. A missing file is [`TemplateError::NotFound`].
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        if !path.is_file() {
            return Err(TemplateError::NotFound(path.to_path_buf()));
        }
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { source })
    }

    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholders that never occur in the template, in declaration order.
    pub fn missing_placeholders(&self) -> Vec<Placeholder> {
        Placeholder::ALL
            .into_iter()
            .filter(|p| !self.source.contains(p.token()))
            .collect()
    }

    /// Check the template for missing placeholders.
    ///
    /// Lenient mode returns one warning per missing token; strict mode turns
    /// any missing token into an error.
    pub fn check(&self, strict: bool) -> Result<Vec<String>, TemplateError> {
        let missing = self.missing_placeholders();
        if strict && !missing.is_empty() {
            return Err(TemplateError::MissingPlaceholders(missing));
        }
        Ok(missing
            .into_iter()
            .map(|p| format!("template has no {} placeholder", p.token()))
            .collect())
    }

    pub fn render(&self, bindings: &Bindings) -> String {
        substitute(&self.source, bindings)
    }
}

/// The stock entry page template.
pub fn stock_template() -> &'static str {
    include_str!("../static/template.html")
}
