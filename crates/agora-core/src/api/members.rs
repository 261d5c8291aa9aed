//! Member accounts and the "my activity" listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::comments::MyCommentPage;
use super::error::ApiError;
use super::posts::PostPage;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub nickname: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NicknameUpdate<'a> {
    nickname: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

impl ApiClient {
    /// Registers a new member account.
    pub async fn signup(&self, request: &SignupRequest<'_>) -> Result<Option<Member>, ApiError> {
        self.post_json("/api/v1/members", request).await
    }

    pub async fn get_member(&self, member_id: i64) -> Result<Option<Member>, ApiError> {
        self.get_json(&format!("/api/v1/members/{member_id}")).await
    }

    pub async fn update_nickname(
        &self,
        member_id: i64,
        nickname: &str,
    ) -> Result<Option<Member>, ApiError> {
        self.put_json(
            &format!("/api/v1/members/{member_id}"),
            &NicknameUpdate { nickname },
        )
        .await
    }

    pub async fn change_password(
        &self,
        member_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        self.patch_json::<serde_json::Value, _>(
            &format!("/api/v1/members/{member_id}/password"),
            &PasswordChange {
                old_password,
                new_password,
            },
        )
        .await?;
        Ok(())
    }

    pub async fn delete_member(&self, member_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/v1/members/{member_id}")).await
    }

    /// Posts authored by the authenticated member, across boards.
    pub async fn my_posts(&self, page: u32, size: u32) -> Result<Option<PostPage>, ApiError> {
        self.get_json(&format!("/api/v1/members/me/posts?page={page}&size={size}"))
            .await
    }

    /// Comments authored by the authenticated member.
    pub async fn my_comments(&self, page: u32, size: u32) -> Result<Option<MyCommentPage>, ApiError> {
        self.get_json(&format!(
            "/api/v1/members/me/comments?page={page}&size={size}"
        ))
        .await
    }
}
