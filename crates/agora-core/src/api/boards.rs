//! Board listing and management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Owning member; board edit/delete are gated on this.
    pub member_id: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct BoardInput<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

impl ApiClient {
    pub async fn list_boards(&self) -> Result<Option<Vec<Board>>, ApiError> {
        self.get_json("/api/v1/boards").await
    }

    pub async fn get_board(&self, board_id: i64) -> Result<Option<Board>, ApiError> {
        self.get_json(&format!("/api/v1/boards/{board_id}")).await
    }

    pub async fn create_board(&self, input: &BoardInput<'_>) -> Result<Option<Board>, ApiError> {
        self.post_json("/api/v1/boards", input).await
    }

    pub async fn update_board(
        &self,
        board_id: i64,
        input: &BoardInput<'_>,
    ) -> Result<Option<Board>, ApiError> {
        self.put_json(&format!("/api/v1/boards/{board_id}"), input)
            .await
    }

    pub async fn delete_board(&self, board_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/v1/boards/{board_id}")).await
    }
}
