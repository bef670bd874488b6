//! # itemplate
//!
//! 把 HTML 片段中的属性值（`img src`、`alt`、`srcset` 中的每个 URL、
//! `a href` 等）登记为可寻址的内容项，并把片段改写成以 UUID 占位符
//! 代替原值的模板；模板与内容项一起可以还原出原片段。
//!
//! ## 模块组织
//!
//! - `core` - 领域类型和单元素处理流程
//! - `config` - 抽取能力表、批处理与存储配置
//! - `env` - 环境变量定义
//! - `error` - 统一错误类型
//! - `parsers` - 属性抽取器与 srcset 分解器
//! - `store` - 内容项存储契约及内存、redb 实现
//! - `builders` - 模板构建与还原
//! - `validator` - 批量校验与报告
//!
//! ## 使用示例
//!
//! ```rust
//! use itemplate::{process_element, restore_element, ContentElement, ExtractionConfig, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let config = ExtractionConfig::default();
//! let element = ContentElement::new("page-1", r#"<img src="x.jpg" alt="Cat">"#);
//!
//! let outcome = process_element(&store, &config, &element).unwrap();
//! assert!(!outcome.template.body.contains("x.jpg"));
//!
//! let restored = restore_element(&store, &config, "page-1", &outcome.template.body).unwrap();
//! assert_eq!(restored.body, element.body);
//! ```

pub mod builders;
pub mod config;
pub mod core;
pub mod env;
pub mod error;
pub mod parsers;
pub mod store;
pub mod validator;

// Re-export commonly used items for convenience
pub use crate::builders::{
    MissReason, RestoreOutcome, SubstitutionMiss, TemplateBuilder, TemplateOutcome,
};
pub use crate::config::{AppConfig, BatchConfig, ConfigManager, ExtractionConfig, StoreConfig};
pub use crate::core::{
    itemize, process_element, restore_element, AttributeKind, ContentElement, ContentItem,
    ElementKind, ElementOutcome,
};
pub use crate::error::{ItemplateError, ItemplateResult};
pub use crate::parsers::{extract_attributes, AttributeExtractor, AttributeTriple};
pub use crate::store::{
    open_store, ContentItemStore, MemoryStore, RandomTokens, RedbStore, TokenSource,
};
pub use crate::validator::{ValidationReport, Validator};
