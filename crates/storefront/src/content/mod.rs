//! Blog content loaded from markdown files.
//!
//! Posts live in `<content_dir>/blog/*.md` with YAML frontmatter. They are
//! loaded once at startup, rendered to HTML, and served read-only. Drafts
//! are loaded but never listed or served.

pub mod drafts;

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use serde::{Deserialize, Serialize};

pub use drafts::{BlogDraft, DraftError, generate_draft, write_draft};

/// Average reading speed used for the reading-time estimate.
const WORDS_PER_MINUTE: usize = 200;

/// Metadata for blog posts
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(alias = "published_at")]
    pub published_at: NaiveDate,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub draft: bool,
}

/// A rendered blog post with metadata and HTML content
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub slug: String,
    #[serde(flatten)]
    pub meta: PostMeta,
    pub content_html: String,
    pub reading_time_minutes: u32,
}

/// Listing entry for a post, without the body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub published_at: NaiveDate,
    pub tags: &'a [String],
    pub reading_time_minutes: u32,
}

impl<'a> From<&'a Post> for PostSummary<'a> {
    fn from(post: &'a Post) -> Self {
        Self {
            slug: &post.slug,
            title: &post.meta.title,
            description: post.meta.description.as_deref(),
            published_at: post.meta.published_at,
            tags: &post.meta.tags,
            reading_time_minutes: post.reading_time_minutes,
        }
    }
}

/// Content store that holds all loaded posts in memory
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    posts: Arc<Vec<Post>>,
}

impl ContentStore {
    /// Load all posts from `<content_dir>/blog`.
    ///
    /// A missing directory yields an empty store. Files that fail to parse
    /// are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the blog directory exists but cannot be read.
    pub fn load(content_dir: &Path) -> Result<Self, ContentError> {
        let posts = Self::load_posts(&content_dir.join("blog"))?;
        Ok(Self {
            posts: Arc::new(posts),
        })
    }

    /// Build a store from already-parsed posts.
    #[must_use]
    pub fn from_posts(mut posts: Vec<Post>) -> Self {
        sort_newest_first(&mut posts);
        Self {
            posts: Arc::new(posts),
        }
    }

    /// Load all blog posts from the blog directory
    fn load_posts(dir: &Path) -> Result<Vec<Post>, ContentError> {
        let mut posts = Vec::new();

        if !dir.exists() {
            tracing::info!("Blog directory does not exist yet: {:?}", dir);
            return Ok(posts);
        }

        let entries = std::fs::read_dir(dir).map_err(|e| ContentError::Io(e.to_string()))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                match Self::load_post(&path) {
                    Ok(post) => {
                        tracing::debug!(slug = %post.slug, draft = post.meta.draft, "Loaded post");
                        posts.push(post);
                    }
                    Err(e) => {
                        tracing::error!("Failed to load post {:?}: {}", path, e);
                    }
                }
            }
        }

        sort_newest_first(&mut posts);
        tracing::info!(count = posts.len(), "Blog posts loaded");

        Ok(posts)
    }

    /// Load a single blog post from a markdown file
    fn load_post(path: &Path) -> Result<Post, ContentError> {
        let content = std::fs::read_to_string(path).map_err(|e| ContentError::Io(e.to_string()))?;

        let filename = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ContentError::Parse("Invalid filename".to_string()))?;

        parse_post(&slug_from_filename(filename), &content)
    }

    /// Get a published blog post by slug
    #[must_use]
    pub fn get_post(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.slug == slug && !p.meta.draft)
    }

    /// Get all published blog posts (excludes drafts), newest first
    pub fn get_published_posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter().filter(|p| !p.meta.draft)
    }

    /// Get published posts by tag
    pub fn get_posts_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Post> {
        let tag_lower = tag.to_lowercase();
        self.get_published_posts()
            .filter(move |p| p.meta.tags.iter().any(|t| t.to_lowercase() == tag_lower))
    }

    /// Number of drafts waiting for review.
    #[must_use]
    pub fn draft_count(&self) -> usize {
        self.posts.iter().filter(|p| p.meta.draft).count()
    }
}

/// Parse a markdown document with frontmatter into a post.
///
/// # Errors
///
/// Returns `ContentError::Parse` if the frontmatter is missing or invalid.
pub fn parse_post(slug: &str, content: &str) -> Result<Post, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<PostMeta> = matter
        .parse(content)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    let content_html = render_markdown(&parsed.content);
    let reading_time_minutes = reading_time(&parsed.content);

    Ok(Post {
        slug: slug.to_string(),
        meta,
        content_html,
        reading_time_minutes,
    })
}

/// Strip a `YYYY-MM-DD-` prefix from a file stem.
fn slug_from_filename(filename: &str) -> String {
    let has_date_prefix = filename.len() > 11
        && filename
            .get(..10)
            .is_some_and(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").is_ok())
        && filename.get(10..11) == Some("-");

    match filename.get(11..) {
        Some(rest) if has_date_prefix => rest.to_string(),
        _ => filename.to_string(),
    }
}

/// Minutes to read `markdown`, never less than one.
fn reading_time(markdown: &str) -> u32 {
    let words = markdown.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.meta
            .published_at
            .cmp(&a.meta.published_at)
            .then_with(|| a.slug.cmp(&b.slug))
    });
}

/// Render markdown to HTML with GitHub Flavored Markdown support.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.header_ids = Some(String::new());
    options.extension.footnotes = true;

    // Generated drafts pass through here, so raw HTML stays escaped.
    options.render.r#unsafe = false;

    markdown_to_html(content, &options)
}

/// Content loading errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = "---
title: Choosing a mat colour
description: Why off-white is usually right
published_at: 2026-03-02
tags: [mats, basics]
---

# Choosing a mat colour

Most prints look best with a **warm white** mat.
";

    #[test]
    fn test_parse_post() {
        let post = parse_post("choosing-a-mat-colour", POST).expect("parse");
        assert_eq!(post.meta.title, "Choosing a mat colour");
        assert_eq!(post.meta.tags, vec!["mats", "basics"]);
        assert!(!post.meta.draft);
        assert!(post.content_html.contains("<strong>warm white</strong>"));
        assert_eq!(post.reading_time_minutes, 1);
    }

    #[test]
    fn test_parse_post_requires_frontmatter() {
        assert!(parse_post("x", "# Just a heading\n").is_err());
    }

    #[test]
    fn test_raw_html_is_not_rendered() {
        let doc = "---\ntitle: T\npublished_at: 2026-01-01\n---\n<script>alert(1)</script>\n";
        let post = parse_post("t", doc).expect("parse");
        assert!(!post.content_html.contains("<script>"));
    }

    #[test]
    fn test_slug_from_filename() {
        assert_eq!(slug_from_filename("2026-03-02-float-mounting"), "float-mounting");
        assert_eq!(slug_from_filename("float-mounting"), "float-mounting");
        assert_eq!(slug_from_filename("2026-13-45-odd"), "2026-13-45-odd");
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(""), 1);
        assert_eq!(reading_time(&"word ".repeat(201)), 2);
    }

    #[test]
    fn test_store_hides_drafts_and_sorts() {
        let older = parse_post("older", POST).expect("parse");
        let newer = parse_post(
            "newer",
            "---\ntitle: Newer\npublished_at: 2026-05-01\n---\nBody\n",
        )
        .expect("parse");
        let draft = parse_post(
            "draft",
            "---\ntitle: Draft\npublished_at: 2026-06-01\ndraft: true\n---\nBody\n",
        )
        .expect("parse");

        let store = ContentStore::from_posts(vec![older, draft, newer]);
        let slugs: Vec<_> = store.get_published_posts().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["newer", "older"]);
        assert!(store.get_post("draft").is_none());
        assert_eq!(store.draft_count(), 1);
        assert_eq!(store.get_posts_by_tag("MATS").count(), 1);
    }

    #[test]
    fn test_load_missing_directory_is_empty() {
        let store = ContentStore::load(Path::new("/nonexistent/frameshop-content"))
            .expect("missing dir is fine");
        assert_eq!(store.get_published_posts().count(), 0);
    }
}
