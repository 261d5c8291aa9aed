//! Threaded comments on posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiError;

/// A comment, with one level of nested replies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub member_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

/// One row of the "my comments" listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyComment {
    pub content: String,
    pub board_id: i64,
    pub post_id: i64,
    #[serde(default)]
    pub post_title: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyCommentPage {
    #[serde(default)]
    pub comments: Vec<MyComment>,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub page: u32,
}

#[derive(Debug, Serialize)]
struct CommentInput<'a> {
    content: &'a str,
}

impl ApiClient {
    pub async fn list_comments(&self, post_id: i64) -> Result<Option<Vec<Comment>>, ApiError> {
        self.get_json(&format!("/api/v1/posts/{post_id}/comments"))
            .await
    }

    pub async fn create_comment(
        &self,
        post_id: i64,
        content: &str,
    ) -> Result<Option<Comment>, ApiError> {
        self.post_json(
            &format!("/api/v1/posts/{post_id}/comments"),
            &CommentInput { content },
        )
        .await
    }

    /// Replies to an existing comment (one nesting level).
    pub async fn reply_to_comment(
        &self,
        post_id: i64,
        parent_id: i64,
        content: &str,
    ) -> Result<Option<Comment>, ApiError> {
        self.post_json(
            &format!("/api/v1/posts/{post_id}/comments/{parent_id}/replies"),
            &CommentInput { content },
        )
        .await
    }

    pub async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        content: &str,
    ) -> Result<Option<Comment>, ApiError> {
        self.put_json(
            &format!("/api/v1/posts/{post_id}/comments/{comment_id}"),
            &CommentInput { content },
        )
        .await
    }

    pub async fn delete_comment(&self, post_id: i64, comment_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/v1/posts/{post_id}/comments/{comment_id}"))
            .await
    }
}
