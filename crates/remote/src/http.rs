use async_trait::async_trait;
use prep_core::RawPayload;
use prep_core::model::{CourseId, RemoteProgress};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::{QuestionUpdate, SyncClient};
use crate::config::ApiConfig;
use crate::error::RemoteError;

/// `detail` of the 404 served when no attempt has been submitted yet.
pub const NO_ANALYTICS_DETAIL: &str = "No analytics found";

/// `SyncClient` over the REST backend.
#[derive(Clone, Debug)]
pub struct HttpSyncClient {
    client: Client,
    config: ApiConfig,
}

impl HttpSyncClient {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    #[must_use]
    pub fn with_client(client: Client, config: ApiConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn progress_path(&self, course: CourseId, action: &str) -> String {
        format!("{}/{course}/{action}/", self.config.kind().progress_prefix())
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(AUTHORIZATION, self.config.authorization())
    }

    async fn get(&self, path: &str) -> Result<Response, RemoteError> {
        let url = self.config.endpoint(path);
        debug!(%url, "GET");
        Ok(self.authorized(self.client.get(url)).send().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let response = self.get(path).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::HttpStatus(status));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), RemoteError> {
        let url = self.config.endpoint(path);
        debug!(%url, "POST");
        let mut request = self.authorized(self.client.post(url));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DetailBody {
    detail: String,
}

#[async_trait]
impl SyncClient for HttpSyncClient {
    async fn fetch_questions(&self, course: CourseId) -> Result<RawPayload, RemoteError> {
        let path = format!("{}/{course}/questions/", self.config.kind().content_prefix());
        self.get_json(&path).await
    }

    async fn fetch_progress(&self, course: CourseId) -> Result<RemoteProgress, RemoteError> {
        self.get_json(&self.progress_path(course, "progress")).await
    }

    async fn submit_question(&self, update: &QuestionUpdate) -> Result<(), RemoteError> {
        let path = format!("{}/update_question/", self.config.kind().progress_prefix());
        self.post(&path, Some(update)).await
    }

    async fn submit_session(&self, course: CourseId) -> Result<(), RemoteError> {
        self.post::<()>(&self.progress_path(course, "submit"), None)
            .await
    }

    async fn quit_session(&self, course: CourseId) -> Result<(), RemoteError> {
        self.post::<()>(&self.progress_path(course, "quit"), None)
            .await
    }

    async fn fetch_latest_analytics(
        &self,
        course: CourseId,
    ) -> Result<Option<RemoteProgress>, RemoteError> {
        let response = self
            .get(&self.progress_path(course, "latest-submitted-analytics"))
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status == StatusCode::NOT_FOUND {
            let sentinel = serde_json::from_slice::<DetailBody>(&bytes)
                .is_ok_and(|body| body.detail == NO_ANALYTICS_DETAIL);
            if sentinel {
                debug!(course_id = %course, "no submitted analytics yet");
                return Ok(None);
            }
            return Err(RemoteError::HttpStatus(status));
        }
        if !status.is_success() {
            return Err(RemoteError::HttpStatus(status));
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
