use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessageArgs, CreateChatCompletionRequestArgs, CreateImageRequestArgs,
    ImageData, ImageSize, ResponseFormat, Role,
};
use async_openai::Client;
use backoff::ExponentialBackoffBuilder;
use serde_json::Value;
use teloxide::dptree::di::{DependencyMap, DependencySupplier};
use thiserror::Error;

use crate::{config::SharedConfig, module_mgr::Module};

const CONTENT_POLICY_CODE: &str = "content_policy_violation";

#[derive(Debug, Error)]
pub(crate) enum ImageError {
    #[error("the prompt was rejected by the content policy")]
    ContentPolicy,
    #[error("no response within {0} seconds")]
    Timeout(u64),
    #[error("server responded with empty data")]
    EmptyResponse,
    #[error(transparent)]
    OpenAI(OpenAIError),
}

impl From<OpenAIError> for ImageError {
    fn from(err: OpenAIError) -> Self {
        match &err {
            OpenAIError::ApiError(api_err)
                if api_err.code.as_ref().and_then(Value::as_str) == Some(CONTENT_POLICY_CODE) =>
            {
                Self::ContentPolicy
            }
            _ => Self::OpenAI(err),
        }
    }
}

/// What to paint: a request the chat model turns into a picture
/// description, plus a style appended to that description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PaintRequest {
    pub description_prompt: String,
    pub style: Option<&'static str>,
}

#[derive(Clone)]
pub(crate) struct ImageClient {
    client: Client,
    config: SharedConfig,
}

impl ImageClient {
    pub(crate) fn new(config: SharedConfig) -> Self {
        // Rate limited requests fail right away instead of being retried.
        let backoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let mut client = Client::new()
            .with_api_key(&config.openai_api_key)
            .with_backoff(backoff);
        if let Some(api_base) = &config.openai_api_base {
            client = client.with_api_base(api_base);
        }
        Self { client, config }
    }

    /// Paints the request and returns the URL of the picture.
    pub(crate) async fn paint(&self, request: &PaintRequest) -> Result<String, ImageError> {
        let mut prompt = self.describe(&request.description_prompt).await?;
        if let Some(style) = request.style {
            prompt.push_str(style);
        }

        let req = CreateImageRequestArgs::default()
            .prompt(prompt)
            .n(1)
            .size(ImageSize::S1024x1024)
            .response_format(ResponseFormat::Url)
            .build()?;
        let resp = self.with_timeout(self.client.images().create(req)).await?;

        resp.data
            .first()
            .and_then(|data| match data.as_ref() {
                ImageData::Url(url) => Some(url.to_string()),
                _ => None,
            })
            .ok_or(ImageError::EmptyResponse)
    }

    async fn describe(&self, description_prompt: &str) -> Result<String, ImageError> {
        let msg = ChatCompletionRequestMessageArgs::default()
            .role(Role::User)
            .content(description_prompt)
            .build()?;
        let req = CreateChatCompletionRequestArgs::default()
            .model(&self.config.openai_gpt_model)
            .temperature(self.config.openai_temperature)
            .messages(vec![msg])
            .build()?;

        let resp = self.with_timeout(self.client.chat().create(req)).await?;
        let description = resp
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ImageError::EmptyResponse)?;
        debug!("Image prompt for \"{}\": {}", description_prompt, description);

        Ok(description)
    }

    async fn with_timeout<F, T>(&self, fut: F) -> Result<T, ImageError>
    where
        F: Future<Output = Result<T, OpenAIError>>,
    {
        let secs = self.config.openai_api_timeout;
        match tokio::time::timeout(Duration::from_secs(secs), fut).await {
            Ok(res) => res.map_err(ImageError::from),
            Err(_) => Err(ImageError::Timeout(secs)),
        }
    }
}

pub(crate) struct OpenAI;

#[async_trait]
impl Module for OpenAI {
    async fn register_dependency(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error> {
        let config: Arc<SharedConfig> = dep_map.get();
        dep_map.insert(ImageClient::new(config.as_ref().clone()));
        Ok(())
    }
}
