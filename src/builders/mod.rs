//! # 构建器模块
//!
//! 这个模块包含把片段转换为模板、再由模板还原片段的构建器：
//!
//! - 正向：属性值替换为 UUID 占位符
//! - 逆向：占位符替换回原值
//!
//! # 模块组织
//!
//! - `template` - 模板构建与还原

pub mod template;

// Re-export commonly used items for convenience
pub use template::{MissReason, RestoreOutcome, SubstitutionMiss, TemplateBuilder, TemplateOutcome};
