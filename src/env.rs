//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，配置加载器用它覆盖文件中的值

use std::env;
use std::fmt;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 仅在变量被显式设置时返回值
    fn get_if_set() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "ITEMPLATE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("warn".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }

    /// 显式指定的配置文件
    pub struct ConfigPath;
    impl EnvVar<String> for ConfigPath {
        const NAME: &'static str = "ITEMPLATE_CONFIG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path of a TOML or JSON configuration file";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }
}

/// 抽取与模板相关环境变量
pub mod extraction {
    use super::*;

    /// 占位符前缀
    pub struct PlaceholderPrefix;
    impl EnvVar<String> for PlaceholderPrefix {
        const NAME: &'static str = "ITEMPLATE_PLACEHOLDER_PREFIX";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Marker written in front of every token (default: uuid_)";

        fn parse(value: &str) -> EnvResult<String> {
            let prefix = value.trim();
            if prefix.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Placeholder prefix cannot be empty".to_string(),
                });
            }
            if prefix.contains(|c: char| c.is_whitespace() || c == ',' || c == '"' || c == '\'')
            {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Placeholder prefix cannot contain whitespace, commas or quotes"
                        .to_string(),
                });
            }
            Ok(prefix.to_string())
        }
    }
}

/// 批处理相关环境变量
pub mod batch {
    use super::*;

    /// 工作线程数
    pub struct Workers;
    impl EnvVar<usize> for Workers {
        const NAME: &'static str = "ITEMPLATE_WORKERS";
        const DEFAULT: Option<usize> = None; // 使用系统默认
        const DESCRIPTION: &'static str = "Number of worker threads (default: CPU cores)";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 256)
        }
    }

    /// 是否校验往返还原
    pub struct VerifyRoundTrip;
    impl EnvVar<bool> for VerifyRoundTrip {
        const NAME: &'static str = "ITEMPLATE_VERIFY_ROUND_TRIP";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Restore every template and compare it with its source";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }
}

/// 存储相关环境变量
pub mod store {
    use super::*;

    /// redb 数据库文件路径
    pub struct Path;
    impl EnvVar<String> for Path {
        const NAME: &'static str = "ITEMPLATE_STORE_PATH";
        const DEFAULT: Option<String> = None; // 未设置时使用内存存储
        const DESCRIPTION: &'static str = "redb file holding content items (default: in-memory)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }
}

/// 辅助函数
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn parse_non_empty(value: &str, var_name: &str) -> EnvResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: "Value cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// 生成环境变量说明文档
pub fn env_docs() -> String {
    let entries: [(&str, &str); 7] = [
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (core::NoColor::NAME, core::NoColor::DESCRIPTION),
        (core::ConfigPath::NAME, core::ConfigPath::DESCRIPTION),
        (
            extraction::PlaceholderPrefix::NAME,
            extraction::PlaceholderPrefix::DESCRIPTION,
        ),
        (batch::Workers::NAME, batch::Workers::DESCRIPTION),
        (batch::VerifyRoundTrip::NAME, batch::VerifyRoundTrip::DESCRIPTION),
        (store::Path::NAME, store::Path::DESCRIPTION),
    ];

    entries
        .iter()
        .map(|(name, description)| format!("    {:<30} {}", name, description))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("yes", "X").unwrap(), true);
        assert_eq!(parse_bool("OFF", "X").unwrap(), false);
        assert!(parse_bool("maybe", "X").is_err());
    }

    #[test]
    fn test_parse_positive_usize_bounds() {
        assert_eq!(parse_positive_usize(" 4 ", "X", 1, 8).unwrap(), 4);
        assert!(parse_positive_usize("0", "X", 1, 8).is_err());
        assert!(parse_positive_usize("9", "X", 1, 8).is_err());
        assert!(parse_positive_usize("four", "X", 1, 8).is_err());
    }

    #[test]
    fn test_placeholder_prefix_rejects_separators() {
        assert_eq!(
            extraction::PlaceholderPrefix::parse("tok_").unwrap(),
            "tok_".to_string()
        );
        assert!(extraction::PlaceholderPrefix::parse("a b").is_err());
        assert!(extraction::PlaceholderPrefix::parse("a,").is_err());
        assert!(extraction::PlaceholderPrefix::parse("   ").is_err());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(core::LogLevel::parse("DEBUG").unwrap(), "debug");
        assert!(core::LogLevel::parse("loud").is_err());
    }

    #[test]
    fn test_env_docs_lists_every_variable() {
        let docs = env_docs();
        assert!(docs.contains("ITEMPLATE_STORE_PATH"));
        assert!(docs.contains("ITEMPLATE_WORKERS"));
        assert!(docs.contains("NO_COLOR"));
    }
}
