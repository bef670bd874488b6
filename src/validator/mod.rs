//! # 校验器
//!
//! 对一批元素依次执行抽取、登记、模板构建，再检查：
//!
//! - 各元素种类的属性计数
//! - 缺少必需属性的元素（如没有 `src` 的 `img`）
//! - 未能替换的内容项
//! - 模板中仍以原值出现的内容项（泄漏）
//! - 模板还原后与原文不一致（srcset 按规范写法比较）
//!
//! 元素之间没有共享状态，使用 rayon 并行处理。单个元素失败
//! （例如存储返回错误）只会成为报告中的一条记录，不会中断整批。
//!
//! # 模块组织
//!
//! - `report` - 报告类型及其汇总

pub mod report;

use std::time::Instant;

use rayon::prelude::*;

use crate::builders::template::TemplateBuilder;
use crate::config::{BatchConfig, ExtractionConfig};
use crate::core::{process_element, ContentElement};
use crate::error::{helpers, ItemplateError, ItemplateResult};
use crate::parsers::html::AttributeExtractor;
use crate::store::ContentItemStore;

pub use report::{
    ElementFailure, ElementReport, LeakedValue, RequiredAttributeViolation, UnmatchedItem,
    ValidationReport,
};

/// 批量校验器
pub struct Validator<'a, S: ContentItemStore + ?Sized> {
    store: &'a S,
    config: &'a ExtractionConfig,
    batch: BatchConfig,
}

impl<'a, S: ContentItemStore + ?Sized> Validator<'a, S> {
    pub fn new(store: &'a S, config: &'a ExtractionConfig) -> Self {
        Validator {
            store,
            config,
            batch: BatchConfig::default(),
        }
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    /// 校验一批元素
    ///
    /// 只有线程池无法创建时返回错误；元素级失败记录在报告的 `failures` 中。
    pub fn run(&self, elements: &[ContentElement]) -> ItemplateResult<ValidationReport> {
        let start = Instant::now();

        let results = if self.batch.workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.batch.workers)
                .build()
                .map_err(|e| ItemplateError::ConfigError(format!("无法创建工作线程池: {}", e)))?;
            pool.install(|| self.check_all(elements))
        } else {
            self.check_all(elements)
        };

        let mut report = ValidationReport::default();
        for (element, result) in elements.iter().zip(results) {
            match result {
                Ok(element_report) => report.absorb(&element.content_id, element_report),
                Err(error) => {
                    let error = error.with_context(&element.content_id);
                    helpers::log_error(&error);
                    report.fail(&element.content_id, &error);
                }
            }
        }
        report.finish(start.elapsed());

        tracing::info!(
            elements = report.elements_processed,
            items = report.items_processed,
            failures = report.failures.len(),
            items_per_second = report.items_per_second,
            "validation finished"
        );

        Ok(report)
    }

    fn check_all(&self, elements: &[ContentElement]) -> Vec<ItemplateResult<ElementReport>> {
        elements
            .par_iter()
            .map(|element| self.check_element(element))
            .collect()
    }

    /// 检查单个元素
    pub fn check_element(&self, element: &ContentElement) -> ItemplateResult<ElementReport> {
        let hint = element.element_kind.clone();
        let mut report = ElementReport::default();

        let extractor = AttributeExtractor::new(self.config).restricted_to(hint.clone());
        for occurrence in extractor.scan_elements(&element.body) {
            for attribute in &occurrence.attributes {
                *report
                    .attribute_counts
                    .entry(attribute.element_kind.clone())
                    .or_default()
                    .entry(attribute.attribute_kind.clone())
                    .or_default() += 1;
            }

            let Some(required) = self.config.required_for(&occurrence.element_kind) else {
                continue;
            };
            for attribute_kind in required {
                if occurrence.has_attribute(attribute_kind) {
                    continue;
                }

                tracing::warn!(
                    content_id = %element.content_id,
                    element = %occurrence.element_kind,
                    attribute = %attribute_kind,
                    offset = occurrence.span.start,
                    "required attribute missing"
                );
                report.missing_required.push(RequiredAttributeViolation {
                    content_id: element.content_id.clone(),
                    element_kind: occurrence.element_kind.clone(),
                    attribute_kind: attribute_kind.clone(),
                    element_index: occurrence.index,
                    offset: occurrence.span.start,
                });
            }
        }

        let outcome = process_element(self.store, self.config, element)?;
        report.items = outcome.items.len();
        report.created = outcome.created;
        report.substitutions = outcome.template.substitutions;

        for miss in &outcome.template.misses {
            report.unmatched_items.push(UnmatchedItem {
                content_id: element.content_id.clone(),
                item_id: miss.item_id,
                attribute_kind: miss.attribute_kind.clone(),
                reason: miss.reason,
            });
        }

        let builder = TemplateBuilder::new(self.config).restricted_to(hint);

        for item_id in builder.leaked_items(&outcome.template.body, &outcome.items) {
            tracing::warn!(content_id = %element.content_id, item_id, "value leaked into template");
            report.leaks.push(LeakedValue {
                content_id: element.content_id.clone(),
                item_id,
            });
        }

        report.round_trip_ok = if self.batch.verify_round_trip {
            let restored = builder.restore(&outcome.template.body, &outcome.items);
            builder.normalize(&element.body) == builder.normalize(&restored.body)
        } else {
            true
        };
        if !report.round_trip_ok {
            tracing::warn!(content_id = %element.content_id, "template does not restore to original");
        }

        tracing::debug!(
            content_id = %element.content_id,
            items = report.items,
            substitutions = report.substitutions,
            "element checked"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttributeKind, ElementKind};
    use crate::store::MemoryStore;

    #[test]
    fn test_reports_missing_src_even_with_alt() {
        let store = MemoryStore::new();
        let config = ExtractionConfig::default();
        let elements = vec![ContentElement::new("p1", r#"<img alt="No source"><img src="ok.png">"#)];

        let report = Validator::new(&store, &config).run(&elements).unwrap();

        assert_eq!(report.missing_required.len(), 1);
        let violation = &report.missing_required[0];
        assert_eq!(violation.element_kind, ElementKind::Img);
        assert_eq!(violation.attribute_kind, AttributeKind::Src);
        assert_eq!(violation.element_index, 0);
        assert_eq!(violation.offset, 0);
    }

    #[test]
    fn test_clean_batch() {
        let store = MemoryStore::new();
        let config = ExtractionConfig::default();
        let elements = vec![
            ContentElement::new(
                "p1",
                r#"<img src="x.jpg" alt="Cat" srcset="x.jpg 1x,   y.jpg 2x">"#,
            ),
            ContentElement::new("p2", r#"<a href="/about" title="About us">About</a>"#),
        ];

        let report = Validator::new(&store, &config)
            .with_batch(BatchConfig {
                workers: 2,
                verify_round_trip: true,
            })
            .run(&elements)
            .unwrap();

        assert!(report.is_clean(), "{}", report.summary());
        assert_eq!(report.elements_processed, 2);
        assert_eq!(report.items_processed, 5);
        assert_eq!(report.substitutions, 6);
        assert_eq!(report.count_for(&ElementKind::Img, &AttributeKind::Srcset), 1);
        assert_eq!(report.count_for(&ElementKind::A, &AttributeKind::Href), 1);
    }

    #[test]
    fn test_stale_items_are_unmatched() {
        let store = MemoryStore::new();
        let config = ExtractionConfig::default();

        Validator::new(&store, &config)
            .run(&[ContentElement::new("p1", r#"<a href="/old">x</a>"#)])
            .unwrap();
        let report = Validator::new(&store, &config)
            .run(&[ContentElement::new("p1", r#"<a href="/new">x</a>"#)])
            .unwrap();

        assert_eq!(report.unmatched_items.len(), 1);
        assert_eq!(report.unmatched_items[0].item_id, 1);
        assert!(report.leaks.is_empty());
        assert!(report.round_trip_failures.is_empty());
    }
}
