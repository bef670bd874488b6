//! 配置模块
//!
//! 类型化的抽取配置（元素种类 → 属性种类能力表）以及配置文件加载器。
//! 属性字典由调用方提供，新增标签/属性组合无需改动抽取逻辑。

pub mod manager;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AttributeKind, ElementKind};
use crate::error::{ItemplateError, ItemplateResult};

// 重新导出主要类型
pub use manager::{AppConfig, BatchConfig, ConfigManager, StoreConfig};

/// 配置常量
pub mod constants {
    /// 占位符默认前缀，完整占位符为 `uuid_<token>`
    pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "uuid_";

    /// 默认能力表
    pub const DEFAULT_ATTRIBUTES: &[(&str, &[&str])] = &[
        ("img", &["src", "alt", "srcset", "sizes", "title"]),
        ("source", &["src", "srcset", "sizes"]),
        ("a", &["href", "title"]),
    ];

    /// 默认必需属性
    pub const DEFAULT_REQUIRED: &[(&str, &[&str])] = &[("img", &["src"]), ("a", &["href"])];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "itemplate.toml",
        ".itemplate.toml",
        "itemplate.json",
        "~/.config/itemplate/config.toml",
        "/etc/itemplate/config.toml",
    ];
}

/// 抽取配置
///
/// `attributes_by_kind` 是静态能力表：抽取器只通过查表判断某个元素上的某个属性
/// 是否需要处理。`required_attributes` 仅供校验器报告缺失属性使用。
///
/// 配置文件中省略 `target_element_kinds` 时，目标元素取能力表中出现的全部元素。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub target_element_kinds: BTreeSet<ElementKind>,
    pub attributes_by_kind: BTreeMap<ElementKind, BTreeSet<AttributeKind>>,
    #[serde(default)]
    pub required_attributes: BTreeMap<ElementKind, BTreeSet<AttributeKind>>,
    #[serde(default = "default_placeholder_prefix")]
    pub placeholder_prefix: String,
}

fn default_placeholder_prefix() -> String {
    constants::DEFAULT_PLACEHOLDER_PREFIX.to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let mut config = ExtractionConfig::empty();

        for (element, attributes) in constants::DEFAULT_ATTRIBUTES {
            config = config.with_attributes(
                ElementKind::from(*element),
                attributes.iter().map(|a| AttributeKind::from(*a)),
            );
        }

        for (element, attributes) in constants::DEFAULT_REQUIRED {
            config = config.with_required(
                ElementKind::from(*element),
                attributes.iter().map(|a| AttributeKind::from(*a)),
            );
        }

        config
    }
}

impl ExtractionConfig {
    /// 创建不包含任何目标元素的配置
    pub fn empty() -> Self {
        ExtractionConfig {
            target_element_kinds: BTreeSet::new(),
            attributes_by_kind: BTreeMap::new(),
            required_attributes: BTreeMap::new(),
            placeholder_prefix: default_placeholder_prefix(),
        }
    }

    /// 注册元素种类及其需要抽取的属性
    pub fn with_attributes<I>(mut self, element: ElementKind, attributes: I) -> Self
    where
        I: IntoIterator<Item = AttributeKind>,
    {
        self.target_element_kinds.insert(element.clone());
        self.attributes_by_kind
            .entry(element)
            .or_default()
            .extend(attributes);
        self
    }

    /// 注册元素种类的必需属性
    pub fn with_required<I>(mut self, element: ElementKind, attributes: I) -> Self
    where
        I: IntoIterator<Item = AttributeKind>,
    {
        self.required_attributes
            .entry(element)
            .or_default()
            .extend(attributes);
        self
    }

    pub fn with_placeholder_prefix(mut self, prefix: &str) -> Self {
        self.placeholder_prefix = prefix.to_string();
        self
    }

    /// 未显式列出目标元素时，以能力表中的元素为准
    pub fn fill_targets(&mut self) {
        if self.target_element_kinds.is_empty() {
            self.target_element_kinds = self.attributes_by_kind.keys().cloned().collect();
        }
    }

    pub fn is_target(&self, element: &ElementKind) -> bool {
        self.target_element_kinds.contains(element)
    }

    /// 能力表查询
    pub fn allows(&self, element: &ElementKind, attribute: &AttributeKind) -> bool {
        self.is_target(element)
            && self
                .attributes_by_kind
                .get(element)
                .is_some_and(|attributes| attributes.contains(attribute))
    }

    pub fn required_for(&self, element: &ElementKind) -> Option<&BTreeSet<AttributeKind>> {
        self.required_attributes.get(element)
    }

    /// 生成令牌对应的占位符
    pub fn placeholder(&self, token: &Uuid) -> String {
        format!("{}{}", self.placeholder_prefix, token.hyphenated())
    }

    /// 解析占位符，返回其中的令牌
    pub fn parse_placeholder(&self, text: &str) -> Option<Uuid> {
        text.strip_prefix(self.placeholder_prefix.as_str())
            .and_then(|token| Uuid::parse_str(token).ok())
    }

    /// 验证配置
    pub fn validate(&self) -> ItemplateResult<()> {
        if self.placeholder_prefix.is_empty() {
            return Err(ItemplateError::ConfigError("占位符前缀不能为空".to_string()));
        }

        if self
            .placeholder_prefix
            .contains(|c: char| c.is_whitespace() || c == ',' || c == '"' || c == '\'')
        {
            return Err(ItemplateError::ConfigError(format!(
                "占位符前缀不能包含空白、逗号或引号: {:?}",
                self.placeholder_prefix
            )));
        }

        if self.target_element_kinds.is_empty() {
            return Err(ItemplateError::ConfigError("至少需要一个目标元素".to_string()));
        }

        for element in &self.target_element_kinds {
            match self.attributes_by_kind.get(element) {
                Some(attributes) if !attributes.is_empty() => {}
                _ => {
                    return Err(ItemplateError::ConfigError(format!(
                        "目标元素 <{}> 没有配置任何属性",
                        element
                    )))
                }
            }
        }

        for (element, required) in &self.required_attributes {
            for attribute in required {
                if !self.allows(element, attribute) {
                    return Err(ItemplateError::ConfigError(format!(
                        "必需属性 {}.{} 不在抽取范围内",
                        element, attribute
                    )));
                }
            }
        }

        Ok(())
    }
}
