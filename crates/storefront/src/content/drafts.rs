//! AI-generated blog drafts.
//!
//! Drafts are written as ordinary markdown files with `draft: true`, so
//! they stay hidden until someone reviews and publishes them by editing the
//! frontmatter.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::claude::{ClaudeClient, ClaudeError, Message};

const DRAFT_SYSTEM_PROMPT: &str = "You write short, practical blog posts for a custom picture \
framing shop. Respond with a single JSON object and nothing else, shaped as \
{\"title\": string, \"description\": string, \"tags\": [string], \"body\": string}. \
The body is GitHub-flavoured markdown without a top-level heading, 300 to 600 words.";

/// Errors producing or saving a draft.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("claude request failed: {0}")]
    Claude(#[from] ClaudeError),

    #[error("generated draft was not valid: {0}")]
    Invalid(String),

    #[error("failed to write draft: {0}")]
    Io(#[from] std::io::Error),
}

/// A generated post waiting to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogDraft {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub body: String,
    pub published_at: NaiveDate,
}

#[derive(Deserialize)]
struct GeneratedDraft {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    body: String,
}

impl BlogDraft {
    /// Parse the model's JSON reply.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Invalid` if no JSON object is found or required
    /// fields are empty.
    pub fn from_generated(text: &str, published_at: NaiveDate) -> Result<Self, DraftError> {
        let json = text
            .find('{')
            .zip(text.rfind('}'))
            .and_then(|(start, end)| text.get(start..=end))
            .ok_or_else(|| DraftError::Invalid("no JSON object in reply".to_string()))?;

        let generated: GeneratedDraft =
            serde_json::from_str(json).map_err(|e| DraftError::Invalid(e.to_string()))?;

        let title = generated.title.trim().to_string();
        let body = generated.body.trim().to_string();
        if title.is_empty() || body.is_empty() {
            return Err(DraftError::Invalid("title and body are required".to_string()));
        }

        Ok(Self {
            title,
            description: generated.description.trim().to_string(),
            tags: generated
                .tags
                .into_iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            body,
            published_at,
        })
    }

    /// URL slug derived from the title.
    #[must_use]
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.title.len());
        for c in self.title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_end_matches('-');
        if slug.is_empty() {
            "untitled".to_string()
        } else {
            slug.to_string()
        }
    }

    /// Markdown document with YAML frontmatter.
    ///
    /// String fields are emitted as JSON strings, which YAML reads verbatim.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let quote = |s: &str| serde_json::Value::String(s.to_string()).to_string();
        let tags = self
            .tags
            .iter()
            .map(|t| quote(t))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "---\ntitle: {}\ndescription: {}\npublished_at: {}\ntags: [{}]\ndraft: true\n---\n\n{}\n",
            quote(&self.title),
            quote(&self.description),
            self.published_at.format("%Y-%m-%d"),
            tags,
            self.body
        )
    }
}

/// Ask Claude for a post about `topic`.
///
/// # Errors
///
/// Returns `DraftError::Claude` if the request fails, or
/// `DraftError::Invalid` if the reply cannot be used.
pub async fn generate_draft(
    client: &ClaudeClient,
    topic: &str,
    today: NaiveDate,
) -> Result<BlogDraft, DraftError> {
    let response = client
        .chat(
            vec![Message::user_text(format!("Write a post about: {topic}"))],
            Some(DRAFT_SYSTEM_PROMPT.to_string()),
        )
        .await?;

    BlogDraft::from_generated(&response.text(), today)
}

/// Write `draft` into `blog_dir` as `YYYY-MM-DD-<slug>.md`.
///
/// Never overwrites: a numeric suffix is added when the name is taken.
///
/// # Errors
///
/// Returns `DraftError::Io` if the directory cannot be created or the file
/// cannot be written.
pub async fn write_draft(blog_dir: &Path, draft: &BlogDraft) -> Result<PathBuf, DraftError> {
    tokio::fs::create_dir_all(blog_dir).await?;

    let stem = format!("{}-{}", draft.published_at.format("%Y-%m-%d"), draft.slug());
    let contents = draft.to_markdown();

    for attempt in 1..=100_u32 {
        let name = if attempt == 1 {
            format!("{stem}.md")
        } else {
            format!("{stem}-{attempt}.md")
        };
        let path = blog_dir.join(name);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                file.write_all(contents.as_bytes()).await?;
                file.flush().await?;
                tracing::info!(path = %path.display(), "Blog draft written");
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
    }

    Err(DraftError::Io(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("too many drafts named {stem}"),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parse_post;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
    }

    fn draft() -> BlogDraft {
        BlogDraft {
            title: "Float Mounting: When & Why".to_string(),
            description: "Show off \"deckled\" edges".to_string(),
            tags: vec!["mounting".to_string()],
            body: "Float mounting lifts the art above the mat.".to_string(),
            published_at: date(),
        }
    }

    #[test]
    fn test_from_generated_with_fences() {
        let reply = "```json\n{\"title\": \" Reveal sizes \", \"tags\": [\"Mats\", \"\"], \"body\": \"Text\"}\n```";
        let draft = BlogDraft::from_generated(reply, date()).expect("parse");
        assert_eq!(draft.title, "Reveal sizes");
        assert_eq!(draft.tags, vec!["mats"]);
        assert_eq!(draft.description, "");
    }

    #[test]
    fn test_from_generated_rejects_empty_body() {
        let reply = r#"{"title": "T", "body": "  "}"#;
        assert!(matches!(
            BlogDraft::from_generated(reply, date()),
            Err(DraftError::Invalid(_))
        ));
        assert!(BlogDraft::from_generated("no json here", date()).is_err());
    }

    #[test]
    fn test_slug() {
        assert_eq!(draft().slug(), "float-mounting-when-why");
        let mut blank = draft();
        blank.title = "!!!".to_string();
        assert_eq!(blank.slug(), "untitled");
    }

    #[test]
    fn test_markdown_round_trips_through_content_parser() {
        let post = parse_post("float", &draft().to_markdown()).expect("parse");
        assert!(post.meta.draft);
        assert_eq!(post.meta.title, "Float Mounting: When & Why");
        assert_eq!(
            post.meta.description.as_deref(),
            Some("Show off \"deckled\" edges")
        );
        assert_eq!(post.meta.published_at, date());
    }

    #[tokio::test]
    async fn test_write_draft_never_overwrites() {
        let dir = std::env::temp_dir().join(format!("frameshop-drafts-{}", uuid::Uuid::new_v4()));
        let first = write_draft(&dir, &draft()).await.expect("first write");
        let second = write_draft(&dir, &draft()).await.expect("second write");
        assert_ne!(first, second);
        assert!(
            second
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("-2.md"))
        );
        tokio::fs::remove_dir_all(&dir).await.expect("cleanup");
    }
}
