//! # Post Bodies and Feed Rendering
//!
//! The ledger treats post content as an opaque string. The command line
//! stores a small JSON body in it so a post can carry an image link or be a
//! story that drops out of feeds after a day:
//!
//! ```text
//! {"text":"hi","imageUrl":"https://...","isStory":true,"expiresAt":1700086400000}
//! ```
//!
//! Content that does not parse as a body is shown verbatim as plain text.

use serde::{Deserialize, Serialize};

use postchain_ledger::config::{STORY_EXPIRING_SOON_MS, STORY_LIFETIME_MS};
use postchain_ledger::Post;

use crate::display::{describe_age, format_timestamp};

/// Structured post content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBody {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_story: bool,
    /// Epoch milliseconds after which a story is hidden.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl PostBody {
    /// Build a body for a new post. Returns `None` when there is neither
    /// text nor an image.
    pub fn compose(text: &str, image_url: Option<String>, story: bool, now: u64) -> Option<Self> {
        let image_url = image_url.filter(|url| !url.trim().is_empty());
        if text.trim().is_empty() && image_url.is_none() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            image_url,
            is_story: story,
            expires_at: story.then(|| now.saturating_add(STORY_LIFETIME_MS)),
        })
    }

    /// Interpret stored post content, falling back to plain text.
    pub fn parse(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|_| Self {
            text: content.to_string(),
            image_url: None,
            is_story: false,
            expires_at: None,
        })
    }

    pub fn to_content(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Whether a feed should list this post at `now`.
    ///
    /// Regular posts are always shown. Stories are shown only when stories
    /// are enabled and the story has not expired; a story without an expiry
    /// never expires.
    pub fn is_visible(&self, now: u64, show_stories: bool) -> bool {
        if !self.is_story {
            return true;
        }
        show_stories && self.expires_at.map_or(true, |at| at > now)
    }

    /// A story with less than an hour left.
    pub fn expiring_soon(&self, now: u64) -> bool {
        self.is_story
            && self
                .expires_at
                .is_some_and(|at| at.saturating_sub(now) < STORY_EXPIRING_SOON_MS)
    }
}

/// Render the visible posts, newest first. Returns an empty vector when
/// nothing is visible.
pub fn render_feed(posts: &[Post], now: u64, show_stories: bool) -> Vec<String> {
    posts
        .iter()
        .rev()
        .filter_map(|post| {
            let body = PostBody::parse(&post.content);
            body.is_visible(now, show_stories)
                .then(|| render_post(post, &body, now))
        })
        .collect()
}

fn render_post(post: &Post, body: &PostBody, now: u64) -> String {
    let mut tag = String::new();
    if body.is_story {
        tag.push_str(" [story");
        if body.expiring_soon(now) {
            tag.push_str(", expiring soon");
        }
        tag.push(']');
    }

    let mut out = format!(
        "#{} {} at {} ({}){}\n  {}",
        post.id,
        post.author,
        format_timestamp(post.created_at),
        describe_age(post.created_at, now),
        tag,
        body.text
    );
    if let Some(url) = &body.image_url {
        out.push_str(&format!("\n  image: {url}"));
    }
    out.push_str(&format!("\n  hash {} nonce {}", post.hash, post.nonce));
    out
}
