//! 校验报告

use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::builders::template::MissReason;
use crate::core::{AttributeKind, ElementKind};
use crate::error::{ErrorCategory, ItemplateError};

/// 缺少必需属性的元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredAttributeViolation {
    pub content_id: String,
    pub element_kind: ElementKind,
    pub attribute_kind: AttributeKind,
    /// 元素在片段中的序号
    pub element_index: usize,
    /// 开始标签的字节偏移
    pub offset: usize,
}

/// 未能替换的内容项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedItem {
    pub content_id: String,
    pub item_id: u64,
    pub attribute_kind: AttributeKind,
    pub reason: MissReason,
}

/// 模板中仍以原值出现的内容项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeakedValue {
    pub content_id: String,
    pub item_id: u64,
}

/// 处理失败的元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementFailure {
    pub content_id: String,
    pub category: ErrorCategory,
    pub error: String,
}

impl ElementFailure {
    pub fn new(content_id: &str, error: &ItemplateError) -> Self {
        ElementFailure {
            content_id: content_id.to_string(),
            category: error.category(),
            error: error.to_string(),
        }
    }
}

/// 单个元素的检查结果
#[derive(Debug, Clone, Default)]
pub struct ElementReport {
    pub items: usize,
    pub created: usize,
    pub substitutions: usize,
    pub attribute_counts: BTreeMap<ElementKind, BTreeMap<AttributeKind, usize>>,
    pub missing_required: Vec<RequiredAttributeViolation>,
    pub unmatched_items: Vec<UnmatchedItem>,
    pub leaks: Vec<LeakedValue>,
    pub round_trip_ok: bool,
}

/// 一批元素的校验报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub elements_processed: usize,
    pub items_processed: usize,
    pub items_created: usize,
    pub substitutions: usize,
    /// 元素种类 → 属性种类 → 出现次数
    pub attribute_counts: BTreeMap<ElementKind, BTreeMap<AttributeKind, usize>>,
    pub missing_required: Vec<RequiredAttributeViolation>,
    pub unmatched_items: Vec<UnmatchedItem>,
    pub leaks: Vec<LeakedValue>,
    /// 还原结果与原文不一致的 content_id
    pub round_trip_failures: Vec<String>,
    pub failures: Vec<ElementFailure>,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
    pub items_per_second: f64,
}

fn serialize_seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl ValidationReport {
    /// 合并单个元素的结果
    pub fn absorb(&mut self, content_id: &str, element: ElementReport) {
        self.elements_processed += 1;
        self.items_processed += element.items;
        self.items_created += element.created;
        self.substitutions += element.substitutions;

        for (element_kind, counts) in element.attribute_counts {
            let merged = self.attribute_counts.entry(element_kind).or_default();
            for (attribute_kind, count) in counts {
                *merged.entry(attribute_kind).or_default() += count;
            }
        }

        self.missing_required.extend(element.missing_required);
        self.unmatched_items.extend(element.unmatched_items);
        self.leaks.extend(element.leaks);
        if !element.round_trip_ok {
            self.round_trip_failures.push(content_id.to_string());
        }
    }

    /// 记录处理失败的元素
    pub fn fail(&mut self, content_id: &str, error: &ItemplateError) {
        self.elements_processed += 1;
        self.failures.push(ElementFailure::new(content_id, error));
    }

    /// 设置耗时并计算吞吐量
    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        self.items_per_second = self.throughput();
    }

    /// 每秒处理的内容项数
    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.items_processed as f64 / seconds
        } else {
            0.0
        }
    }

    pub fn count_for(&self, element: &ElementKind, attribute: &AttributeKind) -> usize {
        self.attribute_counts
            .get(element)
            .and_then(|counts| counts.get(attribute))
            .copied()
            .unwrap_or(0)
    }

    /// 没有任何违规、泄漏、还原失败或元素失败
    pub fn is_clean(&self) -> bool {
        self.missing_required.is_empty()
            && self.unmatched_items.is_empty()
            && self.leaks.is_empty()
            && self.round_trip_failures.is_empty()
            && self.failures.is_empty()
    }

    /// 人类可读的摘要
    pub fn summary(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "处理了 {} 个元素，{} 个内容项（新建 {}），替换 {} 处",
            self.elements_processed, self.items_processed, self.items_created, self.substitutions
        );
        let _ = writeln!(
            out,
            "耗时 {:.3}s，吞吐量 {:.1} 项/秒",
            self.elapsed.as_secs_f64(),
            self.items_per_second
        );

        for (element_kind, counts) in &self.attribute_counts {
            let counts: Vec<String> = counts
                .iter()
                .map(|(attribute_kind, count)| format!("{}={}", attribute_kind, count))
                .collect();
            let _ = writeln!(out, "  <{}> {}", element_kind, counts.join(" "));
        }

        for violation in &self.missing_required {
            let _ = writeln!(
                out,
                "缺少必需属性: {} 第 {} 个 <{}> 没有 {}（偏移 {}）",
                violation.content_id,
                violation.element_index + 1,
                violation.element_kind,
                violation.attribute_kind,
                violation.offset
            );
        }
        for unmatched in &self.unmatched_items {
            let _ = writeln!(
                out,
                "未替换: {} 内容项 {} ({}): {}",
                unmatched.content_id, unmatched.item_id, unmatched.attribute_kind, unmatched.reason
            );
        }
        for leak in &self.leaks {
            let _ = writeln!(out, "泄漏: {} 内容项 {}", leak.content_id, leak.item_id);
        }
        for content_id in &self.round_trip_failures {
            let _ = writeln!(out, "还原不一致: {}", content_id);
        }
        for failure in &self.failures {
            let _ = writeln!(out, "失败: {}: {}", failure.content_id, failure.error);
        }

        out
    }
}
