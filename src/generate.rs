//! Site generation.
//!
//! The build orchestrator. Loads the page template and every entry, obtains a
//! commentary fragment per entry according to the regeneration policy, and
//! writes the final static site.
//!
//! ## Build Sequence
//!
//! 1. Load the page template. Absent template: fatal, nothing is written.
//! 2. Load all entries, newest first. Absent source root: fatal.
//! 3. Link each entry to its chronological neighbors.
//! 4. For each entry, newest first: render the body, obtain commentary,
//!    write the standalone commentary page and the entry page.
//! 5. Rebuild the index and the commentary ledger.
//!
//! ## Regeneration Policy
//!
//! - **`all`**: every entry gets fresh commentary from the configured
//!   provider.
//! - **`latest-only`**: only the newest entry does. Every other entry reuses
//!   `comments/<date>.fragment.html` from an earlier build, or a neutral
//!   placeholder notice when none exists. Reused fragments, and commentary
//!   pages that already exist, are never rewritten.
//!
//! ## Output Structure
//!
//! ```text
//! site/
//! ├── index.html                      # All entries, newest first
//! ├── 2025-01-03.html                 # Entry page
//! ├── comments/
//! │   ├── 2025-01-03.html             # Standalone commentary page
//! │   └── 2025-01-03.fragment.html    # Fragment, reused by later builds
//! └── .commentary-manifest.json       # Fragment provenance, see [`crate::cache`]
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place, so an
//! interrupted build never leaves a half-written artifact.
//!
//! ## Determinism
//!
//! No timestamps, no randomness, no hash-map iteration in the output. With
//! policy `all` and no remote provider, building an unchanged source twice
//! produces byte-identical files.

use crate::cache::{self, CommentaryManifest, CommentaryStats};
use crate::commentary;
use crate::config::{Mode, RegenerationPolicy, SiteConfig};
use crate::naming::EntryDate;
use crate::provider::{CommentaryContext, FallbackProvider, Generated};
use crate::scan::{self, ParseError, ScanError};
use crate::template::{Bindings, Placeholder, Template, TemplateError};
use crate::types::{Entry, Neighbors, Origin};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Missing or unusable top-level resources. Always aborts the build before
/// any entry is processed.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Page template not found: {0}")]
    MissingTemplate(PathBuf),
    #[error("Source root not found: {0}")]
    MissingSourceRoot(PathBuf),
    #[error("Invalid page template: {0}")]
    InvalidTemplate(String),
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Template error: {0}")]
    Template(TemplateError),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("No entry dated {0}")]
    EntryNotFound(String),
}

impl From<ScanError> for BuildError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::SourceRootMissing(path) => {
                ConfigurationError::MissingSourceRoot(path).into()
            }
            ScanError::Io(e) => BuildError::Io(e),
            ScanError::Walk(e) => BuildError::Walk(e),
        }
    }
}

impl From<TemplateError> for BuildError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound(path) => ConfigurationError::MissingTemplate(path).into(),
            TemplateError::MissingPlaceholders(missing) => ConfigurationError::InvalidTemplate(
                TemplateError::MissingPlaceholders(missing).to_string(),
            )
            .into(),
            other => BuildError::Template(other),
        }
    }
}

/// Directory the commentary artifacts live in, relative to the output root.
const COMMENTS_DIR: &str = "comments";

/// Content of an entry page whose body renders to nothing.
const EMPTY_MARKER: &str = r#"<p class="muted">Empty.</p>"#;

/// Filesystem locations for one build.
#[derive(Debug, Clone)]
pub struct BuildPaths {
    pub source: PathBuf,
    pub output: PathBuf,
    pub template: PathBuf,
}

impl BuildPaths {
    /// Paths with the template resolved from `config` against `source`.
    pub fn new(source: &Path, output: &Path, config: &SiteConfig) -> Self {
        Self {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            template: source.join(&config.template.path),
        }
    }

    pub fn with_template(mut self, template: &Path) -> Self {
        self.template = template.to_path_buf();
        self
    }
}

/// What happened to one entry during a build.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRecord {
    pub date: EntryDate,
    pub title: String,
    pub origin: Origin,
    /// Reused fragment generated from an older version of the entry
    pub stale: bool,
}

/// Summary of a finished build.
#[derive(Debug)]
pub struct BuildReport {
    pub output: PathBuf,
    pub mode: Mode,
    pub policy: RegenerationPolicy,
    /// Entries in build order (newest first)
    pub entries: Vec<EntryRecord>,
    /// Entry files that could not be loaded
    pub skipped: Vec<ParseError>,
    /// Non-fatal problems: template checks, remote fallbacks
    pub warnings: Vec<String>,
    pub stats: CommentaryStats,
}

/// Result of validating a source root without writing anything.
#[derive(Debug)]
pub struct CheckReport {
    pub entries: Vec<Entry>,
    pub skipped: Vec<ParseError>,
    pub warnings: Vec<String>,
}

/// Build the whole site.
pub fn build(
    paths: &BuildPaths,
    config: &SiteConfig,
    provider: &FallbackProvider,
) -> Result<BuildReport, BuildError> {
    let (template, mut warnings) = load_template(&paths.template, config)?;
    let discovery = scan::discover(&paths.source, config)?;
    let entries = discovery.entries;
    let policy = config.commentary.effective_policy();

    if config.commentary.mode == Mode::Real
        && let Some(err) = provider.unavailable()
    {
        warnings.push(format!("real mode requested, using local engine: {err}"));
    }

    let comments_dir = paths.output.join(COMMENTS_DIR);
    fs::create_dir_all(&comments_dir)?;

    let previous = CommentaryManifest::load(&paths.output);
    let mut ledger = CommentaryManifest::empty();
    let mut stats = CommentaryStats::default();
    let mut records = Vec::with_capacity(entries.len());

    for (idx, (entry, neighbors)) in entries.iter().zip(link_neighbors(&entries)).enumerate() {
        let date = entry.date.as_str();
        let source_hash = cache::hash_source(&entry.body);
        let fragment_path = comments_dir.join(format!("{date}.fragment.html"));
        let page_path = comments_dir.join(format!("{date}.html"));

        let regenerate = policy == RegenerationPolicy::All || idx == 0;
        let (fragment, origin) = if regenerate {
            let Generated {
                fragment,
                origin,
                warning,
            } = provider.generate(&CommentaryContext::for_entry(entry));
            warnings.extend(warning);
            write_atomic(&fragment_path, fragment.as_bytes())?;
            ledger.record(date, source_hash.clone(), origin);
            (fragment, origin)
        } else {
            match read_fragment(&fragment_path) {
                Ok(Some(fragment)) => {
                    ledger.carry_over(&previous, date);
                    (fragment, Origin::Reused)
                }
                Ok(None) => (
                    commentary::placeholder_notice(&entry.title, date),
                    Origin::Placeholder,
                ),
                Err(err) => {
                    warnings.push(format!("{date}: cannot reuse commentary ({err})"));
                    (
                        commentary::placeholder_notice(&entry.title, date),
                        Origin::Placeholder,
                    )
                }
            }
        };

        let stale = origin == Origin::Reused && previous.is_stale(date, &source_hash);
        if stale {
            stats.stale += 1;
        }
        stats.count(origin);

        if origin.is_fresh() || !page_path.exists() {
            let page = render_commentary_page(entry, &fragment, config);
            write_atomic(&page_path, page.into_string().as_bytes())?;
        }

        let page = render_entry_page(&template, entry, &neighbors, &fragment, config);
        write_atomic(&paths.output.join(format!("{date}.html")), page.as_bytes())?;

        records.push(EntryRecord {
            date: entry.date.clone(),
            title: entry.title.clone(),
            origin,
            stale,
        });
    }

    let index = render_index(&entries, config);
    write_atomic(&paths.output.join("index.html"), index.into_string().as_bytes())?;
    ledger.save(&paths.output)?;

    Ok(BuildReport {
        output: paths.output.clone(),
        mode: config.commentary.mode,
        policy,
        entries: records,
        skipped: discovery.skipped,
        warnings,
        stats,
    })
}

/// Load the template and source root the way [`build`] does, without writing.
pub fn check(paths: &BuildPaths, config: &SiteConfig) -> Result<CheckReport, BuildError> {
    let (_, warnings) = load_template(&paths.template, config)?;
    let discovery = scan::discover(&paths.source, config)?;
    Ok(CheckReport {
        entries: discovery.entries,
        skipped: discovery.skipped,
        warnings,
    })
}

/// Commentary for the single entry dated `date`.
///
/// Uses the same provider and fallback rules as a build. Nothing is written.
pub fn comment(
    source: &Path,
    date: &str,
    href: Option<&str>,
    config: &SiteConfig,
    provider: &FallbackProvider,
) -> Result<Generated, BuildError> {
    let discovery = scan::discover(source, config)?;
    let entry = discovery
        .entries
        .iter()
        .find(|e| e.date.as_str() == date)
        .ok_or_else(|| BuildError::EntryNotFound(date.to_string()))?;
    Ok(provider.generate(&CommentaryContext::for_entry(entry).with_href(href)))
}

fn load_template(path: &Path, config: &SiteConfig) -> Result<(Template, Vec<String>), BuildError> {
    let template = Template::load(path)?;
    let warnings = template.check(config.template.strict)?;
    Ok((template, warnings))
}

/// A previously written fragment, or `None` if there is none.
fn read_fragment(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(fragment) => Ok(Some(fragment)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Chronological neighbors for entries sorted newest first.
///
/// `prev` is the next-older entry (the following element), `next` the
/// next-newer one (the preceding element).
pub fn link_neighbors(entries: &[Entry]) -> Vec<Neighbors> {
    (0..entries.len())
        .map(|i| Neighbors {
            prev: entries.get(i + 1).map(|e| e.date.clone()),
            next: i
                .checked_sub(1)
                .and_then(|j| entries.get(j))
                .map(|e| e.date.clone()),
        })
        .collect()
}

/// Write `contents` to `path` through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

// ============================================================================
// Markdown
// ============================================================================

/// Render an entry body to HTML. The leading `# title` line is left out;
/// the template shows the title on its own.
pub fn render_body(body: &str) -> String {
    let (_, rest) = scan::split_title(body);
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(rest, options);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    if html.trim().is_empty() {
        EMPTY_MARKER.to_string()
    } else {
        html
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Stylesheet reference for pages one directory below the output root.
fn nested_href(href: &str) -> String {
    if href.starts_with('/') || href.contains("://") || href.starts_with("data:") {
        href.to_string()
    } else {
        format!("../{href}")
    }
}

/// HTML-escape plain text for insertion into the template.
fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

/// Renders the base HTML document structure
fn base_document(lang: &str, title: &str, stylesheet: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(lang) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                link rel="stylesheet" href=(stylesheet);
            }
            body {
                main.wrap {
                    (content)
                }
            }
        }
    }
}

/// Prev/next links below an entry's content.
pub fn render_nav(date: &EntryDate, neighbors: &Neighbors) -> Markup {
    html! {
        nav.entry-nav {
            @if let Some(prev) = &neighbors.prev {
                a.nav-prev href={ (prev.as_str()) ".html" } rel="prev" { "← " (prev.as_str()) }
            }
            a.nav-index href="index.html" { "all entries" }
            a.nav-comment href={ (COMMENTS_DIR) "/" (date.as_str()) ".html" } { "commentary" }
            @if let Some(next) = &neighbors.next {
                a.nav-next href={ (next.as_str()) ".html" } rel="next" { (next.as_str()) " →" }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Full entry page: the author's template with title, body, navigation and
/// commentary substituted in.
fn render_entry_page(
    template: &Template,
    entry: &Entry,
    neighbors: &Neighbors,
    fragment: &str,
    config: &SiteConfig,
) -> String {
    let content = format!(
        "{}\n{}",
        render_body(&entry.body),
        render_nav(&entry.date, neighbors).into_string()
    );
    let bindings = Bindings::new()
        .bind(Placeholder::Title, escape(&entry.title))
        .bind(Placeholder::Css, escape(&config.stylesheet))
        .bind(Placeholder::Content, content)
        .bind(Placeholder::Commentary, fragment);
    template.render(&bindings)
}

/// Standalone page wrapping one entry's commentary.
fn render_commentary_page(entry: &Entry, fragment: &str, config: &SiteConfig) -> Markup {
    let content = html! {
        header.card {
            h1 { (entry.title) }
            p.muted { (entry.date.dotted()) }
            p {
                a href={ "../" (entry.date.as_str()) ".html" } { "← to the entry" }
                " · "
                a href="../index.html" { "all entries" }
            }
        }
        (PreEscaped(fragment))
    };
    let title = format!("Commentary · {}", entry.title);
    base_document(&config.lang, &title, &nested_href(&config.stylesheet), content)
}

/// Index page listing every entry, newest first.
fn render_index(entries: &[Entry], config: &SiteConfig) -> Markup {
    let content = html! {
        header.card {
            h1 { (config.site_name) }
        }
        @if entries.is_empty() {
            p.muted { "No entries yet." }
        } @else {
            ul.entry-list {
                @for entry in entries {
                    li {
                        time datetime=(entry.date.as_str()) { (entry.date.as_str()) }
                        " "
                        a href={ (entry.date.as_str()) ".html" } { (entry.title) }
                    }
                }
            }
        }
    };
    base_document(&config.lang, &config.site_name, &config.stylesheet, content)
}

// ============================================================================
// Tests
// ============================================================================
