//! Admin-only endpoints. The backend enforces the role; callers without it
//! get a 403 rejection.

use reqwest::Method;
use serde_json::Value;

use super::{ApiClient, ApiError, RequestOptions};
use crate::models::{SystemStats, Task, TaskFilter, UserProfile, UserRole};

pub const ADMIN_PATH: &str = "/admin";

impl ApiClient {
    /// Tasks across all users. Honors `limit`, `offset`, `status` and `user_id`.
    pub async fn admin_all_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        self.get_json(ADMIN_PATH, filter.to_query()).await
    }

    pub async fn admin_user_tasks(
        &self,
        user_id: &str,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, ApiError> {
        self.get_json(
            &format!("{}/users/{}/tasks", ADMIN_PATH, user_id),
            filter.to_query(),
        )
        .await
    }

    pub async fn admin_user_info(&self, user_id: &str) -> Result<UserProfile, ApiError> {
        self.call(Method::GET, &format!("{}/users/{}", ADMIN_PATH, user_id))
            .await
    }

    /// The role goes in the query string, not the body.
    pub async fn admin_update_role(&self, user_id: &str, role: UserRole) -> Result<Value, ApiError> {
        let options = RequestOptions::new().query("role", role.as_str());
        self.request(
            Method::PATCH,
            &format!("{}/users/{}/role", ADMIN_PATH, user_id),
            options,
            true,
        )
        .await
    }

    pub async fn admin_stats(&self) -> Result<SystemStats, ApiError> {
        self.call(Method::GET, &format!("{}/stats", ADMIN_PATH)).await
    }
}
