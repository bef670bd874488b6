//! 配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值。
//! 加载顺序：`.env` 文件 → 配置文件 → 环境变量覆盖 → 验证。

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{constants, ExtractionConfig};
use crate::error::{ItemplateError, ItemplateResult};

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub batch: BatchConfig,
    pub store: StoreConfig,
}

/// 批处理配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// 工作线程数，0 表示使用 rayon 默认值
    pub workers: usize,
    /// 是否对每个模板做还原校验
    pub verify_round_trip: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            verify_round_trip: true,
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// redb 文件路径；为空时使用内存存储
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl AppConfig {
    /// 验证配置
    pub fn validate(&self) -> ItemplateResult<()> {
        self.extraction.validate()?;

        if let Some(path) = &self.store.path {
            if path.trim().is_empty() {
                return Err(ItemplateError::ConfigError("存储路径不能为空".to_string()));
            }
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) -> ItemplateResult<()> {
        use crate::env::{batch, extraction, store, EnvVar};

        if let Some(prefix) = extraction::PlaceholderPrefix::get_if_set() {
            self.extraction.placeholder_prefix = prefix?;
        }

        if let Some(workers) = batch::Workers::get_if_set() {
            self.batch.workers = workers?;
        }

        if let Some(verify) = batch::VerifyRoundTrip::get_if_set() {
            self.batch.verify_round_trip = verify?;
        }

        if let Some(path) = store::Path::get_if_set() {
            let path = path?;
            tracing::info!("环境变量覆盖存储路径: {}", path);
            self.store.path = Some(path);
        }

        Ok(())
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
}

impl ConfigManager {
    /// 按默认搜索路径创建配置管理器
    pub fn new() -> ItemplateResult<Self> {
        Self::load(None)
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(path: &str) -> ItemplateResult<Self> {
        Self::load(Some(path))
    }

    fn load(explicit_path: Option<&str>) -> ItemplateResult<Self> {
        Self::load_dotenv();

        let mut config = match explicit_path {
            Some(path) => Self::load_from_file(&shellexpand::tilde(path))?,
            None => Self::load_config()?,
        };
        config.apply_env_overrides()?;
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// 从搜索路径加载配置
    fn load_config() -> ItemplateResult<AppConfig> {
        use crate::env::{core::ConfigPath, EnvVar};

        if let Some(path) = ConfigPath::get_if_set() {
            let path = path?;
            return Self::load_from_file(&shellexpand::tilde(&path));
        }

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(AppConfig::default())
    }

    /// 从指定文件加载配置
    pub fn load_from_file(path: &str) -> ItemplateResult<AppConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ItemplateError::ConfigError(format!("读取配置文件失败 {}: {}", path, e)))?;

        Self::parse(path, &content)
    }

    /// 按扩展名解析配置内容，`.json` 以外一律按 TOML 处理
    pub fn parse(path: &str, content: &str) -> ItemplateResult<AppConfig> {
        let parsed = if path.ends_with(".json") {
            serde_json::from_str::<AppConfig>(content).map_err(ItemplateError::from)
        } else {
            toml::from_str::<AppConfig>(content).map_err(ItemplateError::from)
        };
        let mut config = parsed.map_err(|e| e.with_context(path))?;
        config.extraction.fill_targets();

        Ok(config)
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> ItemplateResult<()> {
        let config = AppConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| ItemplateError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ItemplateError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
