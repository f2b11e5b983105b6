//! 视觉推理服务 - 业务能力层
//!
//! 只负责"发一张图，拿一段回答"的能力，不关心批量和顺序
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务
//!
//! ## 失败隔离
//! 网络错误、非成功状态码、响应结构不符都不会向上抛出，
//! 而是变成带样本 ID 的 `SampleResult::Failure`。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;
use crate::models::{SampleImage, SampleOutcome, SampleRequest};
use crate::utils::logging::truncate_text;

/// 推理能力的抽象
///
/// 调度器只依赖这个 trait；一次调用对应一次外部请求，结果总是一个 `SampleOutcome`。
#[async_trait]
pub trait VisionInference: Send + Sync {
    async fn invoke(&self, request: SampleRequest) -> SampleOutcome;
}

/// 回答长度限制使用的字段名
///
/// 不同模型的请求格式只在这一点上不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLimitField {
    /// `max_tokens`（gpt-4o、gpt-4o-mini 及兼容服务）
    MaxTokens,
    /// `max_completion_tokens`（gpt-5 系列与 o 系列推理模型）
    MaxCompletionTokens,
}

impl TokenLimitField {
    /// 按模型名选择字段
    pub fn for_model(model: &str) -> Self {
        let model = model.trim().to_ascii_lowercase();
        let model = model.rsplit('/').next().unwrap_or(&model);
        const COMPLETION_TOKEN_PREFIXES: [&str; 4] = ["gpt-5", "o1", "o3", "o4"];

        if COMPLETION_TOKEN_PREFIXES
            .iter()
            .any(|prefix| model.starts_with(prefix))
        {
            TokenLimitField::MaxCompletionTokens
        } else {
            TokenLimitField::MaxTokens
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenLimitField::MaxTokens => "max_tokens",
            TokenLimitField::MaxCompletionTokens => "max_completion_tokens",
        }
    }

    #[allow(deprecated)]
    fn apply(self, builder: &mut CreateChatCompletionRequestArgs, limit: u32) {
        match self {
            TokenLimitField::MaxTokens => {
                builder.max_tokens(limit);
            }
            TokenLimitField::MaxCompletionTokens => {
                builder.max_completion_tokens(limit);
            }
        }
    }
}

impl fmt::Display for TokenLimitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenLimitField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "max_tokens" => Ok(TokenLimitField::MaxTokens),
            "max_completion_tokens" => Ok(TokenLimitField::MaxCompletionTokens),
            other => Err(format!("未知的长度限制字段: {}", other)),
        }
    }
}

/// 关闭 SDK 自带的重试：限流和 5xx 直接作为失败返回
fn no_retry_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// 视觉推理服务
///
/// 职责：
/// - 为单个样本构建包含图片的请求
/// - 调用 API 并提取第一个候选回答
/// - 把所有失败收敛成 `SampleResult::Failure`
/// - 不重试、不缓存、不限流
pub struct VisionService {
    client: Client<OpenAIConfig>,
    model_name: String,
    prompt: String,
    max_tokens: u32,
    token_limit_field: TokenLimitField,
}

impl VisionService {
    /// 创建新的视觉推理服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.api_base_url);

        let client = Client::with_config(openai_config).with_backoff(no_retry_backoff());

        Self {
            client,
            model_name: config.model_name.clone(),
            prompt: config.prompt.clone(),
            max_tokens: config.max_tokens,
            token_limit_field: config
                .token_limit_field
                .unwrap_or_else(|| TokenLimitField::for_model(&config.model_name)),
        }
    }

    pub fn token_limit_field(&self) -> TokenLimitField {
        self.token_limit_field
    }

    /// 构建单个样本的请求：一条用户消息 = 文字指令（可为空）+ 图片
    pub fn build_request(&self, image: &SampleImage) -> Result<CreateChatCompletionRequest, LlmError> {
        let build_failed = |e: async_openai::error::OpenAIError| LlmError::RequestBuildFailed {
            model: self.model_name.clone(),
            message: e.to_string(),
        };

        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: self.prompt.clone(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: image.to_data_url(),
                        detail: Some(ImageDetail::High),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()
            .map_err(build_failed)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)]);
        self.token_limit_field.apply(&mut builder, self.max_tokens);

        builder.build().map_err(build_failed)
    }

    /// 发送一次请求并返回第一个候选回答
    pub async fn complete(&self, image: &SampleImage, sample_id: usize) -> Result<String, LlmError> {
        if image.is_empty() {
            return Err(LlmError::EmptyImage);
        }

        let request = self.build_request(image)?;

        debug!(
            "[样本 {}] 调用 LLM API，模型: {}，长度字段: {}",
            sample_id, self.model_name, self.token_limit_field
        );

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("[样本 {}] LLM API 调用失败: {}", sample_id, e);
            LlmError::ApiCallFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        let choice = response.choices.first().ok_or_else(|| LlmError::EmptyResponse {
            model: self.model_name.clone(),
        })?;

        let content = choice
            .message
            .content
            .clone()
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        debug!(
            "[样本 {}] LLM API 调用成功: {}",
            sample_id,
            truncate_text(&content, 60)
        );

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl VisionInference for VisionService {
    async fn invoke(&self, request: SampleRequest) -> SampleOutcome {
        match self.complete(&request.image, request.id).await {
            Ok(text) => SampleOutcome::success(request.id, text),
            Err(e) => SampleOutcome::failure(request.id, e.to_string()),
        }
    }
}
