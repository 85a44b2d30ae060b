use super::error::{PollAttemptError, SubmitError};
use super::{AdvisorBackend, PollStatus};
use crate::cache::LocalStore;
use crate::config::Settings;
use crate::domain::{TaskId, UserProfile};
use anyhow::{ensure, Context};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const START_TASK_SEGMENT: &str = "startTask";
const GET_RESULT_SEGMENT: &str = "getResult";

#[derive(Debug, Clone)]
pub struct HttpAdvisorBackend {
    http: reqwest::Client,
    base_url: Url,
    auth: Option<HeaderValue>,
}

impl HttpAdvisorBackend {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let auth = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| HeaderValue::from_str(&format!("Bearer {t}")))
            .transpose()
            .context("api token is not a valid header value")?;

        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid advisor base url: {base_url}"))?;
        ensure!(
            !base_url.cannot_be_a_base(),
            "advisor base url must be hierarchical: {base_url}"
        );

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build advisor http client")?;

        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    /// Token lookup order: the locally stored token, then `MONEYFI_API_TOKEN`.
    pub fn from_settings(settings: &Settings, store: Option<&LocalStore>) -> anyhow::Result<Self> {
        let stored = store.and_then(|s| match s.load_token() {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read stored api token");
                None
            }
        });
        let token = stored.or_else(|| settings.api_token.clone());

        Self::new(
            &settings.advisor_base_url,
            token.as_deref(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn has_token(&self) -> bool {
        self.auth.is_some()
    }

    /// Append path segments to the base url. Each segment is percent-encoded,
    /// so `/`, `?` and `#` inside a task id stay part of that segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Infallible: hierarchical urls are checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(value) => req.header(AUTHORIZATION, value.clone()),
            None => req,
        }
    }
}

#[derive(Debug, Serialize)]
struct StartTaskRequest<'a> {
    user_inputs: &'a UserProfile,
}

#[derive(Debug, Deserialize)]
struct StartTaskResponse {
    #[serde(default)]
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskStatusResponse {
    status: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl TaskStatusResponse {
    fn into_poll_status(self) -> Result<PollStatus, PollAttemptError> {
        match self.status.as_str() {
            "processing" => Ok(PollStatus::Processing),
            "completed" => Ok(PollStatus::Completed(self.result.unwrap_or(Value::Null))),
            "error" => {
                let message = match self.error {
                    Some(Value::String(s)) if !s.trim().is_empty() => s,
                    Some(Value::Null) | None => "unknown error".to_string(),
                    Some(Value::String(_)) => "unknown error".to_string(),
                    Some(other) => other.to_string(),
                };
                Ok(PollStatus::Failed(message))
            }
            other => Err(PollAttemptError::MalformedBody {
                detail: format!("unknown task status {other:?}"),
            }),
        }
    }
}

#[async_trait::async_trait]
impl AdvisorBackend for HttpAdvisorBackend {
    async fn start_task(&self, profile: &UserProfile) -> Result<TaskId, SubmitError> {
        let url = self.endpoint(&[START_TASK_SEGMENT]);
        let res = self
            .authorize(self.http.post(url))
            .json(&StartTaskRequest {
                user_inputs: profile,
            })
            .send()
            .await
            .map_err(SubmitError::Transport)?;

        let status = res.status();
        let text = res.text().await.map_err(SubmitError::Transport)?;
        if !status.is_success() {
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed = serde_json::from_str::<StartTaskResponse>(&text).map_err(|e| {
            SubmitError::MalformedBody {
                detail: format!("{e}: {text}"),
            }
        })?;

        parsed
            .task_id
            .and_then(TaskId::new)
            .ok_or_else(|| SubmitError::MalformedBody {
                detail: format!("missing task_id: {text}"),
            })
    }

    async fn fetch_status(&self, task_id: &TaskId) -> Result<PollStatus, PollAttemptError> {
        let url = self.endpoint(&[GET_RESULT_SEGMENT, task_id.as_str()]);
        let res = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(PollAttemptError::Transport)?;

        match res.status() {
            // 202 needs no body; treat it like a "processing" status.
            StatusCode::ACCEPTED => return Ok(PollStatus::Processing),
            StatusCode::NOT_FOUND => return Ok(PollStatus::NotFound),
            s if !s.is_success() => {
                return Err(PollAttemptError::Status { status: s.as_u16() });
            }
            _ => {}
        }

        let text = res.text().await.map_err(PollAttemptError::Transport)?;
        let parsed = serde_json::from_str::<TaskStatusResponse>(&text).map_err(|e| {
            PollAttemptError::MalformedBody {
                detail: format!("{e}: {text}"),
            }
        })?;
        parsed.into_poll_status()
    }
}
