//! HTML 扫描模块
//!
//! - `utils`: 基础常量和工具函数
//! - `extractor`: 属性抽取器（扁平标签流，不构建 DOM）
//! - `srcset`: srcset 列表的拆分与拼接

pub mod extractor;
pub mod srcset;
pub mod utils;

pub use extractor::{
    extract_attributes, AttributeExtractor, AttributeTriple, ElementOccurrence, Extraction,
};
pub use srcset::{join_srcset, normalize_srcset, parse_srcset, SrcSetItem};
pub use utils::{is_whitespace, SRCSET_SEPARATOR, WHITESPACES};
