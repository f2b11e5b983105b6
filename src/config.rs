use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError, FileError};
use crate::services::TokenLimitField;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 一批发送的样本数量
    pub sample_size: usize,
    /// 同时在途的请求上限
    pub max_concurrent_samples: usize,
    /// 单个样本的等待上限（秒），0 表示不限
    pub sample_timeout_secs: u64,
    /// 待发送的试卷图片
    pub image_path: String,
    /// 随图片一起发送的文字指令，可以为空
    pub prompt: String,
    /// 结果 JSON 输出文件（可选）
    pub output_file: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub api_key: String,
    pub api_base_url: String,
    pub model_name: String,
    pub max_tokens: u32,
    /// 强制指定长度限制字段，None 时按模型自动选择
    pub token_limit_field: Option<TokenLimitField>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_size: 10,
            max_concurrent_samples: 10,
            sample_timeout_secs: 120,
            image_path: "test-image.png".to_string(),
            prompt: String::new(),
            output_file: None,
            verbose_logging: false,
            api_key: String::new(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            model_name: "gpt-5.1".to_string(),
            max_tokens: 2048,
            token_limit_field: None,
        }
    }
}

/// TOML 配置文件的形状，所有字段都可省略
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    sample_size: Option<usize>,
    max_concurrent_samples: Option<usize>,
    sample_timeout_secs: Option<u64>,
    image_path: Option<String>,
    prompt: Option<String>,
    output_file: Option<String>,
    verbose_logging: Option<bool>,
    api_base_url: Option<String>,
    model_name: Option<String>,
    max_tokens: Option<u32>,
    token_limit_field: Option<TokenLimitField>,
}

impl Config {
    /// 先读取 TOML 文件（不存在则跳过），再用环境变量覆盖
    pub async fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let base = if exists {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
            tracing::debug!("已读取配置文件: {}", path.display());
            Self::from_toml_str(&content, &path.display().to_string())?
        } else {
            Self::default()
        };
        base.with_env_overrides()
    }

    fn from_toml_str(content: &str, path: &str) -> AppResult<Self> {
        let file: FileConfig = toml::from_str(content).map_err(|source| FileError::TomlParseFailed {
            path: path.to_string(),
            source,
        })?;

        let default = Self::default();
        Ok(Self {
            sample_size: file.sample_size.unwrap_or(default.sample_size),
            max_concurrent_samples: file
                .max_concurrent_samples
                .unwrap_or(default.max_concurrent_samples),
            sample_timeout_secs: file
                .sample_timeout_secs
                .unwrap_or(default.sample_timeout_secs),
            image_path: file.image_path.unwrap_or(default.image_path),
            prompt: file.prompt.unwrap_or(default.prompt),
            output_file: file.output_file.or(default.output_file),
            verbose_logging: file.verbose_logging.unwrap_or(default.verbose_logging),
            api_key: default.api_key,
            api_base_url: file.api_base_url.unwrap_or(default.api_base_url),
            model_name: file.model_name.unwrap_or(default.model_name),
            max_tokens: file.max_tokens.unwrap_or(default.max_tokens),
            token_limit_field: file.token_limit_field.or(default.token_limit_field),
        })
    }

    fn with_env_overrides(self) -> AppResult<Self> {
        Ok(Self {
            sample_size: env_parse("SAMPLE_SIZE")?.unwrap_or(self.sample_size),
            max_concurrent_samples: env_parse("MAX_CONCURRENT_SAMPLES")?
                .unwrap_or(self.max_concurrent_samples),
            sample_timeout_secs: env_parse("SAMPLE_TIMEOUT_SECS")?
                .unwrap_or(self.sample_timeout_secs),
            image_path: std::env::var("IMAGE_PATH").unwrap_or(self.image_path),
            prompt: std::env::var("PROMPT").unwrap_or(self.prompt),
            output_file: std::env::var("OUTPUT_FILE").ok().or(self.output_file),
            verbose_logging: env_parse("VERBOSE_LOGGING")?.unwrap_or(self.verbose_logging),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or(self.api_key),
            api_base_url: std::env::var("OPENAI_API_BASE").unwrap_or(self.api_base_url),
            model_name: std::env::var("MODEL_NAME").unwrap_or(self.model_name),
            max_tokens: env_parse("MAX_TOKENS")?.unwrap_or(self.max_tokens),
            token_limit_field: env_parse("TOKEN_LIMIT_FIELD")?.or(self.token_limit_field),
        })
    }

    /// 启动前的致命检查
    pub fn validate(&self) -> AppResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::config_missing("OPENAI_API_KEY"));
        }
        if self.sample_size == 0 {
            return Err(AppError::config_invalid("sample_size", "必须大于 0"));
        }
        if self.max_concurrent_samples == 0 {
            return Err(AppError::config_invalid(
                "max_concurrent_samples",
                "必须大于 0",
            ));
        }
        if self.image_path.trim().is_empty() {
            return Err(AppError::config_missing("IMAGE_PATH"));
        }
        Ok(())
    }

    /// 单个样本的等待上限
    pub fn sample_timeout(&self) -> Option<Duration> {
        match self.sample_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn env_parse<T: FromStr>(var_name: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}
