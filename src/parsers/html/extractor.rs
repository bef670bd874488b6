//! 属性抽取器
//!
//! 把 HTML 片段当作扁平的标签流扫描，不构建 DOM。对每个目标元素，
//! 按出现顺序返回能力表中登记过的属性实例及其值在原文中的字节区间。
//!
//! ## 匹配规则
//!
//! - 元素名、属性名不区分大小写
//! - 属性值可以使用双引号、单引号或不加引号，`=` 两侧的空白被忽略
//! - 同一元素多次出现时各自独立处理
//! - HTML 注释中的标签被跳过
//!
//! ## 容错
//!
//! 格式错误的片段从不导致失败：一直延续到输入末尾的标签照常扫描。
//! 引号内的值可以包含 `<` 和 `>`。闭合引号之后若紧跟的不是空白、`>`、`/>`
//! 或输入末尾，视为引号未闭合：标签在该引号之后的第一个 `>` 处结束，
//! 该属性及其后的内容不产生三元组，后续标签照常扫描。

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::core::{AttributeKind, ElementKind};

/// 注释或开始标签的起点。组1为元素名，注释没有
const TAG_PATTERN: &str = r#"(?s)<!--.*?(?:-->|\z)|<([A-Za-z][A-Za-z0-9:_-]*)"#;

/// 单个属性。组1为属性名，组2/3/4分别为双引号、单引号、无引号的值
const ATTRIBUTE_PATTERN: &str =
    r#"([^\s"'<>/=`]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#;

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(TAG_PATTERN).expect("invalid tag regex"))
}

fn attribute_regex() -> &'static Regex {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE.get_or_init(|| Regex::new(ATTRIBUTE_PATTERN).expect("invalid attribute regex"))
}

/// 开始标签在元素名之后的边界
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TagBounds {
    /// 属性区的结束位置；引号未闭合时停在该引号处
    area_end: usize,
    /// 标签的结束位置（含 `>`）
    end: usize,
    terminated: bool,
}

impl TagBounds {
    fn quote_unterminated(&self) -> bool {
        let close = if self.terminated { self.end - 1 } else { self.end };
        self.area_end < close
    }
}

/// 从 `from` 扫描到开始标签结束
fn tag_bounds(body: &str, from: usize) -> TagBounds {
    let bytes = body.as_bytes();
    let mut at = from;

    while at < bytes.len() {
        match bytes[at] {
            b'>' => {
                return TagBounds {
                    area_end: at,
                    end: at + 1,
                    terminated: true,
                }
            }
            quote @ (b'"' | b'\'') => {
                let close = bytes[at + 1..]
                    .iter()
                    .position(|&b| b == quote)
                    .map(|offset| at + 1 + offset);

                match close {
                    Some(close) if continues_tag(&bytes[close + 1..]) => at = close + 1,
                    _ => {
                        return match bytes[at..].iter().position(|&b| b == b'>') {
                            Some(offset) => TagBounds {
                                area_end: at,
                                end: at + offset + 1,
                                terminated: true,
                            },
                            None => TagBounds {
                                area_end: at,
                                end: bytes.len(),
                                terminated: false,
                            },
                        };
                    }
                }
            }
            _ => at += 1,
        }
    }

    TagBounds {
        area_end: bytes.len(),
        end: bytes.len(),
        terminated: false,
    }
}

/// 闭合引号之后是否仍处在标签内：空白、`>`、`/>` 或输入末尾
fn continues_tag(rest: &[u8]) -> bool {
    match rest {
        [] | [b'>', ..] | [b'/'] | [b'/', b'>', ..] => true,
        [b, ..] => b.is_ascii_whitespace(),
    }
}

/// 一个被抽取的属性实例
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<'b> {
    /// 所属目标元素在片段中的序号（从 0 开始）
    pub element_index: usize,
    pub element_kind: ElementKind,
    pub attribute_kind: AttributeKind,
    /// 原始值，不含引号
    pub value: &'b str,
    /// `value` 在片段中的字节区间
    pub span: Range<usize>,
    /// 包裹值的引号，无引号写法为 `None`
    pub quote: Option<char>,
}

impl Extraction<'_> {
    pub fn to_triple(&self) -> AttributeTriple {
        AttributeTriple {
            element_kind: self.element_kind.clone(),
            attribute_kind: self.attribute_kind.clone(),
            value: self.value.to_string(),
        }
    }
}

/// 抽取结果三元组 (element_kind, attribute_kind, value)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTriple {
    pub element_kind: ElementKind,
    pub attribute_kind: AttributeKind,
    pub value: String,
}

/// 一个目标元素的出现
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementOccurrence<'b> {
    pub index: usize,
    pub element_kind: ElementKind,
    /// 整个开始标签的字节区间
    pub span: Range<usize>,
    /// 标签是否以 `>` 正常结束
    pub terminated: bool,
    /// 出现过的已登记属性，包括没有值的布尔写法
    pub present: Vec<AttributeKind>,
    /// 带值的已登记属性
    pub attributes: Vec<Extraction<'b>>,
}

impl ElementOccurrence<'_> {
    pub fn has_attribute(&self, attribute: &AttributeKind) -> bool {
        self.present.contains(attribute)
    }
}

/// 属性抽取器
pub struct AttributeExtractor<'c> {
    config: &'c ExtractionConfig,
    only: Option<ElementKind>,
}

impl<'c> AttributeExtractor<'c> {
    pub fn new(config: &'c ExtractionConfig) -> Self {
        AttributeExtractor { config, only: None }
    }

    /// 只处理指定种类的元素；`None` 表示处理全部目标元素
    pub fn restricted_to(mut self, only: Option<ElementKind>) -> Self {
        self.only = only;
        self
    }

    fn wants(&self, element: &ElementKind) -> bool {
        self.config.is_target(element) && self.only.as_ref().map_or(true, |only| only == element)
    }

    /// 扫描片段中的全部目标元素
    pub fn scan_elements<'b>(&self, body: &'b str) -> Vec<ElementOccurrence<'b>> {
        let mut occurrences: Vec<ElementOccurrence<'b>> = vec![];

        let mut at = 0;

        while let Some(captures) = tag_regex().captures_at(body, at) {
            let Some(tag) = captures.get(0) else {
                break;
            };
            // 注释没有元素名
            let Some(name) = captures.get(1) else {
                at = tag.end();
                continue;
            };

            let bounds = tag_bounds(body, name.end());
            at = bounds.end;

            let element_kind = ElementKind::from(name.as_str());
            if !self.wants(&element_kind) {
                continue;
            }

            let terminated = bounds.terminated;
            if !terminated {
                tracing::debug!(offset = tag.start(), element = %element_kind, "tag runs to end of input");
            }
            if bounds.quote_unterminated() {
                tracing::debug!(offset = bounds.area_end, element = %element_kind, "unterminated quote in tag");
            }
            let area_start = name.end();
            let area = &body[area_start..bounds.area_end];

            let index = occurrences.len();
            let mut present: Vec<AttributeKind> = vec![];
            let mut attributes: Vec<Extraction<'b>> = vec![];

            for attribute in attribute_regex().captures_iter(area) {
                let Some(attribute_name) = attribute.get(1) else {
                    continue;
                };
                let attribute_kind = AttributeKind::from(attribute_name.as_str());
                if !self.config.allows(&element_kind, &attribute_kind) {
                    continue;
                }

                present.push(attribute_kind.clone());

                let value = match (attribute.get(2), attribute.get(3), attribute.get(4)) {
                    (Some(value), _, _) => Some((value, Some('"'))),
                    (_, Some(value), _) => Some((value, Some('\''))),
                    (_, _, Some(value)) => Some((value, None)),
                    _ => None,
                };
                if let Some((value, quote)) = value {
                    let start = area_start + value.start();
                    let end = area_start + value.end();
                    attributes.push(Extraction {
                        element_index: index,
                        element_kind: element_kind.clone(),
                        attribute_kind,
                        value: &body[start..end],
                        span: start..end,
                        quote,
                    });
                }
            }

            occurrences.push(ElementOccurrence {
                index,
                element_kind,
                span: tag.start()..bounds.end,
                terminated,
                present,
                attributes,
            });
        }

        occurrences
    }

    /// 按出现顺序返回全部属性实例
    pub fn extract<'b>(&self, body: &'b str) -> Vec<Extraction<'b>> {
        self.scan_elements(body)
            .into_iter()
            .flat_map(|occurrence| occurrence.attributes)
            .collect()
    }
}

/// 抽取片段中的 (element_kind, attribute_kind, value) 三元组
pub fn extract_attributes(body: &str, config: &ExtractionConfig) -> Vec<AttributeTriple> {
    AttributeExtractor::new(config)
        .extract(body)
        .iter()
        .map(Extraction::to_triple)
        .collect()
}
