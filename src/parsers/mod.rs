//! # 解析器模块
//!
//! 这个模块包含扫描 HTML 片段所需的全部功能：
//!
//! - 目标元素及其属性值的抽取
//! - 响应式图片 `srcset` 列表的分解与拼接
//!
//! # 模块组织
//!
//! - `html` - 属性抽取器、srcset 分解器及相关常量

pub mod html;

// Re-export commonly used items for convenience
pub use html::{
    extract_attributes, join_srcset, normalize_srcset, parse_srcset, AttributeExtractor,
    AttributeTriple, SrcSetItem,
};
