//! 内存存储
//!
//! 以 `content_id` 分片保存内容项，令牌集合单独维护以检测冲突。

use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use super::{ContentItemStore, RandomTokens, TokenSource};
use crate::core::{AttributeKind, ContentItem, ElementKind};
use crate::error::{ItemplateError, ItemplateResult};

/// 基于 dashmap 的内存存储
pub struct MemoryStore {
    items: DashMap<String, Vec<ContentItem>>,
    tokens: DashSet<uuid::Uuid>,
    token_source: Arc<dyn TokenSource>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_token_source(Arc::new(RandomTokens))
    }

    pub fn with_token_source(token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            items: DashMap::new(),
            tokens: DashSet::new(),
            token_source,
        }
    }

    /// 存储中的内容项总数
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentItemStore for MemoryStore {
    fn create_item(
        &self,
        content_id: &str,
        element_kind: &ElementKind,
        attribute_kind: &AttributeKind,
        value: &str,
    ) -> ItemplateResult<ContentItem> {
        let token = self.token_source.next_token();
        if !self.tokens.insert(token) {
            return Err(ItemplateError::TokenCollision { token });
        }

        // 条目锁保证同一 content_id 内的序号连续
        let mut entry = self.items.entry(content_id.to_string()).or_default();
        let item = ContentItem::new(
            content_id,
            entry.len() as u64 + 1,
            token,
            element_kind.clone(),
            attribute_kind.clone(),
            value,
        );
        entry.push(item.clone());

        Ok(item)
    }

    fn list_items_for(&self, content_id: &str) -> ItemplateResult<Vec<ContentItem>> {
        Ok(self
            .items
            .get(content_id)
            .map(|items| items.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct ScriptedTokens(Mutex<Vec<Uuid>>);

    impl TokenSource for ScriptedTokens {
        fn next_token(&self) -> Uuid {
            self.0.lock().unwrap().remove(0)
        }
    }

    #[test]
    fn test_item_ids_are_sequential_per_content() {
        let store = MemoryStore::new();

        let a1 = store
            .create_item("a", &ElementKind::Img, &AttributeKind::Src, "1.jpg")
            .unwrap();
        let b1 = store
            .create_item("b", &ElementKind::Img, &AttributeKind::Src, "1.jpg")
            .unwrap();
        let a2 = store
            .create_item("a", &ElementKind::Img, &AttributeKind::Alt, "One")
            .unwrap();

        assert_eq!((a1.item_id, a2.item_id, b1.item_id), (1, 2, 1));
        assert_ne!(a1.token, b1.token);
        assert_eq!(store.list_items_for("a").unwrap(), vec![a1, a2]);
        assert!(store.list_items_for("missing").unwrap().is_empty());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_duplicate_token_is_rejected() {
        let token = Uuid::from_u128(42);
        let store = MemoryStore::with_token_source(Arc::new(ScriptedTokens(Mutex::new(vec![
            token, token,
        ]))));

        store
            .create_item("a", &ElementKind::A, &AttributeKind::Href, "/x")
            .unwrap();
        let result = store.create_item("b", &ElementKind::A, &AttributeKind::Href, "/y");

        assert!(matches!(
            result,
            Err(ItemplateError::TokenCollision { token: t }) if t == token
        ));
        assert!(store.list_items_for("b").unwrap().is_empty());
    }
}
