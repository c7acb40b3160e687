#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{path::Path, time::Duration};

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest, ImageDetail,
        ImageUrl,
    },
};
use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::{
    ImageDescription, JudgmentRequest, RawJudgment, SemanticGrader,
    prompt::{DESCRIBE_IMAGE_PROMPT, SYSTEM_PROMPT, build_user_prompt, image_prompt},
};
use crate::{config::OpenAiSettings, constants::MAX_IMAGE_TOKENS, error::SemanticGraderFault};

/// Semantic grader backed by an OpenAI-compatible chat completions API.
pub struct OpenAiGrader {
    /// API client.
    client:   OpenAIClient<OpenAIConfig>,
    /// Model, limits and credentials.
    settings: OpenAiSettings,
}

impl OpenAiGrader {
    /// Creates a grader from resolved settings.
    pub fn new(settings: OpenAiSettings) -> Self {
        let client = OpenAIClient::with_config(
            OpenAIConfig::new()
                .with_api_base(settings.api_base().to_owned())
                .with_api_key(settings.api_key().to_owned()),
        );

        Self { client, settings }
    }

    /// Sends `messages` to `model` and returns the reply text.
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
        max_tokens: u32,
    ) -> Result<String, SemanticGraderFault> {
        let request = CreateChatCompletionRequest {
            model: model.to_owned(),
            messages,
            temperature: self.settings.temperature(),
            max_completion_tokens: Some(max_tokens),
            n: Some(1),
            ..Default::default()
        };

        let secs = self.settings.request_timeout_secs();
        let response = tokio::time::timeout(
            Duration::from_secs(secs),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| SemanticGraderFault::Timeout {
            model: model.to_owned(),
            secs,
        })?
        .map_err(|e| SemanticGraderFault::Request {
            model:   model.to_owned(),
            message: e.to_string(),
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| SemanticGraderFault::EmptyResponse(model.to_owned()))
    }

    /// Message list for describing one image.
    fn image_messages(
        path: &Path,
        caption: &str,
    ) -> anyhow::Result<Vec<ChatCompletionRequestMessage>> {
        let bytes = std::fs::read(path)?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let url = format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(bytes));

        let parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: image_prompt(caption),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url,
                        detail: Some(ImageDetail::Auto),
                    },
                },
            ),
        ];

        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(DESCRIBE_IMAGE_PROMPT)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(parts))
                .build()?
                .into(),
        ])
    }
}

impl SemanticGrader for OpenAiGrader {
    async fn judge(
        &self,
        request: &JudgmentRequest<'_>,
    ) -> Result<RawJudgment, SemanticGraderFault> {
        let model = self.settings.model();
        let request_error = |e: async_openai::error::OpenAIError| SemanticGraderFault::Request {
            model:   model.to_owned(),
            message: e.to_string(),
        };

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(request_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_user_prompt(request))
                .build()
                .map_err(request_error)?
                .into(),
        ];

        tracing::debug!(student = request.student_id, "Requesting judgment from `{model}`");
        let content = self
            .complete(model, messages, self.settings.max_tokens())
            .await?;

        Ok(RawJudgment::from_response(&content)?)
    }

    async fn describe_image(&self, path: &Path, caption: &str) -> ImageDescription {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let description = match Self::image_messages(path, caption) {
            Ok(messages) => {
                match self
                    .complete(self.settings.vision_model(), messages, MAX_IMAGE_TOKENS)
                    .await
                {
                    Ok(text) => text.trim().to_string(),
                    Err(e) => format!("Error analyzing image: {e}"),
                }
            }
            Err(e) => format!("Error analyzing image: {e:#}"),
        };

        ImageDescription {
            filename,
            caption: caption.to_string(),
            description,
        }
    }
}
