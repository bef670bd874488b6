// 集成测试公共模块
//
// 提供可预测的令牌来源、会失败的存储和测试片段

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use itemplate::{
    AttributeKind, ContentItem, ContentItemStore, ElementKind, ItemplateError, ItemplateResult,
    MemoryStore, TokenSource,
};
use uuid::Uuid;

/// 依次产生 1, 2, 3 … 对应的令牌
#[derive(Default)]
pub struct SequentialTokens {
    next: AtomicU64,
}

impl TokenSource for SequentialTokens {
    fn next_token(&self) -> Uuid {
        token(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// 第 n 个顺序令牌
pub fn token(n: u64) -> Uuid {
    Uuid::from_u128(n as u128)
}

/// 第 n 个顺序令牌的默认占位符
pub fn placeholder(n: u64) -> String {
    format!("uuid_{}", token(n).hyphenated())
}

/// 令牌可预测的内存存储
pub fn sequential_store() -> MemoryStore {
    MemoryStore::with_token_source(Arc::new(SequentialTokens::default()))
}

/// 对指定 content_id 返回存储错误的存储
pub struct FailingStore {
    inner: MemoryStore,
    failing_content_id: String,
}

impl FailingStore {
    pub fn new(failing_content_id: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_content_id: failing_content_id.to_string(),
        }
    }

    fn check(&self, content_id: &str) -> ItemplateResult<()> {
        if content_id == self.failing_content_id {
            Err(ItemplateError::StorageError("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ContentItemStore for FailingStore {
    fn create_item(
        &self,
        content_id: &str,
        element_kind: &ElementKind,
        attribute_kind: &AttributeKind,
        value: &str,
    ) -> ItemplateResult<ContentItem> {
        self.check(content_id)?;
        self.inner
            .create_item(content_id, element_kind, attribute_kind, value)
    }

    fn list_items_for(&self, content_id: &str) -> ItemplateResult<Vec<ContentItem>> {
        self.check(content_id)?;
        self.inner.list_items_for(content_id)
    }
}

/// 覆盖各种属性写法的片段
pub fn sample_fragments() -> Vec<&'static str> {
    vec![
        r#"<img src="x.jpg" alt="Cat" srcset="x.jpg 1x, y.jpg 2x">"#,
        r#"<p>Intro</p><img alt="cat"><img alt="cat picture" src="/img/cat.png">"#,
        "<IMG SRC = 'hero.webp' ALT=Hero title=\"Big\n   hero\">",
        r#"<a href="/a/b">deep</a> <a href="/a" title="A">shallow</a>"#,
        r#"<picture><source srcset="a.avif 1x, b.avif 2x" sizes="100vw"><img src="a.jpg" alt=""></picture>"#,
        r#"<!-- <img src="hidden.jpg"> --><a href="https://example.com/?q=1&amp;r=2">link</a>"#,
        r#"<img src="x.jpg" alt="Cat" <p>broken"#,
        "",
    ]
}
