//! Task endpoints for the signed-in user.

use reqwest::Method;
use serde_json::Value;

use super::{ApiClient, ApiError};
use crate::models::{NewTask, Task, TaskFilter, TaskUpdate};

pub const TASKS_PATH: &str = "/tasks";

impl ApiClient {
    /// List the user's tasks
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        self.get_json(TASKS_PATH, filter.to_query()).await
    }

    pub async fn get_task(&self, id: i64) -> Result<Task, ApiError> {
        self.call(Method::GET, &format!("{}/{}", TASKS_PATH, id)).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.send_json(Method::POST, TASKS_PATH, task).await
    }

    pub async fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.send_json(Method::PUT, &format!("{}/{}", TASKS_PATH, id), update)
            .await
    }

    /// Flip the completion flag and return the updated task
    pub async fn toggle_task(&self, id: i64) -> Result<Task, ApiError> {
        self.call(Method::PATCH, &format!("{}/{}/complete", TASKS_PATH, id))
            .await
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), ApiError> {
        let _: Value = self
            .call(Method::DELETE, &format!("{}/{}", TASKS_PATH, id))
            .await?;
        Ok(())
    }

    // ===== AI assistance =====
    // Shapes are owned by the backend's AI service and vary by provider,
    // so they are passed through untyped.

    pub async fn task_suggestions(&self) -> Result<Value, ApiError> {
        self.call(Method::GET, &format!("{}/ai/suggestions", TASKS_PATH))
            .await
    }

    pub async fn productivity_insights(&self) -> Result<Value, ApiError> {
        self.call(Method::GET, &format!("{}/ai/insights", TASKS_PATH))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::ApiClient;
    use crate::models::{NewTask, TaskFilter, TaskStatus};
    use crate::test_utils::{token_for, Harness, BASE_URL, NOW};
    use reqwest::Method;
    use serde_json::{json, Value};

    fn task_json(id: i64, title: &str, completed: bool) -> Value {
        json!({
            "id": id,
            "user_id": "u-1",
            "title": title,
            "description": null,
            "completed": completed,
            "due_date": null,
            "created_at": "2025-02-01T10:00:00",
            "updated_at": "2025-02-01T10:00:00"
        })
    }

    fn signed_in() -> (Harness, ApiClient) {
        let h = Harness::new();
        h.store.put(&token_for("u-1", NOW + 3600)).unwrap();
        let api = ApiClient::new(h.transport.clone(), h.session.clone(), BASE_URL);
        (h, api)
    }

    #[tokio::test]
    async fn test_list_tasks_with_filter() {
        let (h, api) = signed_in();
        h.transport
            .push_json(200, json!([task_json(1, "a", false), task_json(2, "b", false)]));

        let filter = TaskFilter {
            status: Some(TaskStatus::Pending),
            ..TaskFilter::default()
        };
        let tasks = api.list_tasks(&filter).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(
            h.transport.last_request().url,
            format!("{}/tasks?status=pending", BASE_URL)
        );
    }

    #[tokio::test]
    async fn test_create_task_posts_body() {
        let (h, api) = signed_in();
        h.transport.push_json(200, task_json(5, "Buy milk", false));

        let task = api
            .create_task(&NewTask::new("Buy milk").with_description("2%"))
            .await
            .unwrap();
        assert_eq!(task.id, 5);

        let request = h.transport.last_request();
        assert_eq!(request.method, Method::POST);
        let body: Value = serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Buy milk", "description": "2%"}));
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let (h, api) = signed_in();
        h.transport.push_json(200, task_json(5, "x", true));
        h.transport
            .push_json(200, json!({"message": "Task deleted successfully"}));

        assert!(api.toggle_task(5).await.unwrap().completed);
        api.delete_task(5).await.unwrap();

        let requests = h.transport.requests();
        assert_eq!(requests[0].method, Method::PATCH);
        assert_eq!(requests[0].url, format!("{}/tasks/5/complete", BASE_URL));
        assert_eq!(requests[1].method, Method::DELETE);
        assert_eq!(requests[1].url, format!("{}/tasks/5", BASE_URL));
    }

    #[tokio::test]
    async fn test_task_calls_require_session() {
        let h = Harness::new();
        let api = ApiClient::new(h.transport.clone(), h.session.clone(), BASE_URL);
        assert!(api.list_tasks(&TaskFilter::default()).await.is_err());
        assert!(api.delete_task(1).await.is_err());
        assert_eq!(h.transport.calls(), 0);
    }
}
