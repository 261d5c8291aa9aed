//! Post listing, search, and management.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::{ApiClient, FilePart, Payload};
use super::error::ApiError;

/// Sort order for board post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Latest,
    Oldest,
    Views,
    Likes,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Latest => "latest",
            SortOrder::Oldest => "oldest",
            SortOrder::Views => "views",
            SortOrder::Likes => "likes",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(SortOrder::Latest),
            "oldest" => Ok(SortOrder::Oldest),
            "views" => Ok(SortOrder::Views),
            "likes" => Ok(SortOrder::Likes),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// One row of a post listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub view_count: u32,
    #[serde(default)]
    pub like_count: u32,
    /// Present in the "my posts" listing, which spans boards.
    #[serde(default)]
    pub board_id: Option<i64>,
    #[serde(default)]
    pub board_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A full post as returned by the detail endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub member_id: i64,
    pub nickname: String,
    #[serde(default)]
    pub view_count: u32,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Paged listing envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    #[serde(default)]
    pub posts: Vec<PostSummary>,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub page: u32,
}

#[derive(Debug, Serialize)]
pub struct PostInput<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPost {
    pub id: i64,
}

impl ApiClient {
    pub async fn list_posts(
        &self,
        board_id: i64,
        page: u32,
        size: u32,
        sort: SortOrder,
    ) -> Result<Option<PostPage>, ApiError> {
        self.get_json(&format!(
            "/api/v1/boards/{board_id}/posts?page={page}&size={size}&sort={sort}"
        ))
        .await
    }

    pub async fn get_post(&self, board_id: i64, post_id: i64) -> Result<Option<Post>, ApiError> {
        self.get_json(&format!("/api/v1/boards/{board_id}/posts/{post_id}"))
            .await
    }

    pub async fn create_post(
        &self,
        board_id: i64,
        input: &PostInput<'_>,
    ) -> Result<Option<CreatedPost>, ApiError> {
        self.post_json(&format!("/api/v1/boards/{board_id}/posts"), input)
            .await
    }

    pub async fn update_post(
        &self,
        board_id: i64,
        post_id: i64,
        input: &PostInput<'_>,
    ) -> Result<Option<Post>, ApiError> {
        self.put_json(&format!("/api/v1/boards/{board_id}/posts/{post_id}"), input)
            .await
    }

    pub async fn delete_post(&self, board_id: i64, post_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/v1/boards/{board_id}/posts/{post_id}"))
            .await
    }

    /// Keyword search across boards.
    pub async fn search_posts(
        &self,
        keyword: &str,
        page: u32,
        size: u32,
    ) -> Result<Option<PostPage>, ApiError> {
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("keyword", keyword)
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string())
            .finish();
        self.get_json(&format!("/api/v1/posts/search?{query}")).await
    }

    /// Attaches an image to a post as multipart form data.
    ///
    /// Call sites treat this as best-effort: a failure is logged and never
    /// fails the surrounding operation.
    pub async fn upload_post_image(
        &self,
        post_id: i64,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ApiError> {
        let payload = Payload::Multipart(FilePart {
            field: "image".to_string(),
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            bytes,
        });
        self.send_json::<serde_json::Value>(
            reqwest::Method::POST,
            &format!("/api/v1/posts/{post_id}/images"),
            payload,
        )
        .await?;
        Ok(())
    }
}
