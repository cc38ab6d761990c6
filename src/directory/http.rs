//! reqwest implementation of `DirectoryGateway`.
//!
//! Every call carries the tenant-scoped bearer token, a bounded timeout, and
//! a small retry budget with exponential backoff for throttling (429) and
//! 5xx responses. Only after the budget is spent does a transient failure
//! surface, at which point the engine records it as a logical action failure.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::AccessToken;
use crate::config::DirectoryConfig;
use crate::directory::{
    AppAssignment, AuthMethodRef, DirectoryError, DirectoryGateway, DirectoryGroup,
    DirectoryResult, ManagedDevice, TeamRef,
};

use async_trait::async_trait;

/// List responses arrive wrapped in a `value` envelope.
#[derive(serde::Deserialize)]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

pub struct HttpDirectoryGateway {
    client: Client,
    base_url: String,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl HttpDirectoryGateway {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_sec))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    fn request(&self, method: Method, path: &str, token: &AccessToken) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(token.secret())
    }

    /// Send with retry on throttling and server errors. The request is
    /// rebuilt per attempt via `try_clone`; bodies here are always JSON, so
    /// cloning never fails in practice.
    async fn send_with_retry(&self, req: RequestBuilder) -> DirectoryResult<reqwest::Response> {
        let mut backoff = self.retry_backoff;
        let mut last_err: Option<DirectoryError> = None;

        for attempt in 1..=self.max_attempts {
            let attempt_req = match req.try_clone() {
                Some(r) => r,
                None => {
                    return Err(DirectoryError::Transport(
                        "request body is not retryable".to_string(),
                    ))
                }
            };

            match attempt_req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        warn!(%status, attempt, "transient directory response, will retry");
                        last_err = Some(DirectoryError::Api {
                            status: status.as_u16(),
                            message: resp.text().await.unwrap_or_default(),
                        });
                    } else {
                        // Non-transient rejection: no point retrying.
                        return Err(DirectoryError::Api {
                            status: status.as_u16(),
                            message: resp.text().await.unwrap_or_default(),
                        });
                    }
                }
                Err(e) => {
                    debug!(error = %e, attempt, "directory request transport error");
                    last_err = Some(DirectoryError::Transport(e.to_string()));
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(last_err
            .unwrap_or_else(|| DirectoryError::Transport("retries exhausted".to_string())))
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<T>> {
        let resp = self
            .send_with_retry(self.request(Method::GET, path, token))
            .await?;
        let envelope: ListEnvelope<T> = resp
            .json()
            .await
            .map_err(|e| DirectoryError::Payload(e.to_string()))?;
        Ok(envelope.value)
    }

    async fn send_empty(
        &self,
        method: Method,
        path: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_with_retry(self.request(method, path, token))
            .await?;
        Ok(())
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: serde_json::Value,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_with_retry(self.request(method, path, token).json(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryGateway for HttpDirectoryGateway {
    async fn disable_sign_in(&self, user_id: &str, token: &AccessToken) -> DirectoryResult<()> {
        self.send_json(
            Method::PATCH,
            &format!("/users/{user_id}"),
            json!({ "accountEnabled": false }),
            token,
        )
        .await
    }

    async fn set_password(
        &self,
        user_id: &str,
        new_password: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_json(
            Method::POST,
            &format!("/users/{user_id}/reset-password"),
            json!({ "newPassword": new_password, "forceChangeAtNextSignIn": false }),
            token,
        )
        .await
    }

    async fn revoke_sessions(&self, user_id: &str, token: &AccessToken) -> DirectoryResult<()> {
        self.send_empty(
            Method::POST,
            &format!("/users/{user_id}/revoke-sessions"),
            token,
        )
        .await
    }

    async fn assigned_licenses(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<String>> {
        self.get_list(&format!("/users/{user_id}/licenses"), token)
            .await
    }

    async fn remove_licenses(
        &self,
        user_id: &str,
        sku_ids: &[String],
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_json(
            Method::POST,
            &format!("/users/{user_id}/remove-licenses"),
            json!({ "skuIds": sku_ids }),
            token,
        )
        .await
    }

    async fn member_groups(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<DirectoryGroup>> {
        self.get_list(&format!("/users/{user_id}/member-groups"), token)
            .await
    }

    async fn remove_group_member(
        &self,
        group_id: &str,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/groups/{group_id}/members/{user_id}"),
            token,
        )
        .await
    }

    async fn joined_teams(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<TeamRef>> {
        self.get_list(&format!("/users/{user_id}/teams"), token)
            .await
    }

    async fn remove_team_member(
        &self,
        team_id: &str,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/teams/{team_id}/members/{user_id}"),
            token,
        )
        .await
    }

    async fn app_assignments(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<AppAssignment>> {
        self.get_list(&format!("/users/{user_id}/app-role-assignments"), token)
            .await
    }

    async fn remove_app_assignment(
        &self,
        user_id: &str,
        assignment_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/users/{user_id}/app-role-assignments/{assignment_id}"),
            token,
        )
        .await
    }

    async fn auth_methods(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<AuthMethodRef>> {
        self.get_list(&format!("/users/{user_id}/auth-methods"), token)
            .await
    }

    async fn delete_auth_method(
        &self,
        user_id: &str,
        method_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_empty(
            Method::DELETE,
            &format!("/users/{user_id}/auth-methods/{method_id}"),
            token,
        )
        .await
    }

    async fn convert_to_shared_mailbox(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_empty(
            Method::POST,
            &format!("/users/{user_id}/mailbox/convert-to-shared"),
            token,
        )
        .await
    }

    async fn set_mail_forwarding(
        &self,
        user_id: &str,
        forward_to: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_json(
            Method::PATCH,
            &format!("/users/{user_id}/mailbox/forwarding"),
            json!({ "forwardTo": forward_to, "keepCopy": true }),
            token,
        )
        .await
    }

    async fn set_auto_reply(
        &self,
        user_id: &str,
        message: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_json(
            Method::PATCH,
            &format!("/users/{user_id}/mailbox/auto-reply"),
            json!({ "state": "enabled", "message": message }),
            token,
        )
        .await
    }

    async fn archive_drive(
        &self,
        user_id: &str,
        destination: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_json(
            Method::POST,
            &format!("/users/{user_id}/drive/archive"),
            json!({ "destination": destination }),
            token,
        )
        .await
    }

    async fn transfer_drive_ownership(
        &self,
        user_id: &str,
        new_owner: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_json(
            Method::POST,
            &format!("/users/{user_id}/drive/transfer"),
            json!({ "newOwner": new_owner }),
            token,
        )
        .await
    }

    async fn managed_devices(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<ManagedDevice>> {
        self.get_list(&format!("/users/{user_id}/managed-devices"), token)
            .await
    }

    async fn wipe_device(&self, device_id: &str, token: &AccessToken) -> DirectoryResult<()> {
        self.send_empty(Method::POST, &format!("/devices/{device_id}/wipe"), token)
            .await
    }

    async fn retire_device(&self, device_id: &str, token: &AccessToken) -> DirectoryResult<()> {
        self.send_empty(Method::POST, &format!("/devices/{device_id}/retire"), token)
            .await
    }

    async fn uninstall_managed_apps(
        &self,
        device_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.send_empty(
            Method::POST,
            &format!("/devices/{device_id}/remove-apps"),
            token,
        )
        .await
    }
}
