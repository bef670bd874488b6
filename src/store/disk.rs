//! 磁盘存储
//!
//! 使用 redb 持久化内容项。记录以 JSON 编码保存在 `(content_id, item_id)`
//! 键下，令牌表把令牌映射回记录键，用于检测冲突。

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use super::{ContentItemStore, RandomTokens, TokenSource};
use crate::core::{AttributeKind, ContentItem, ElementKind};
use crate::error::{ItemplateError, ItemplateResult};

const ITEMS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("content_items");
const TOKENS_TABLE: TableDefinition<u128, (&str, u64)> = TableDefinition::new("item_tokens");

/// 基于 redb 的内容项存储
pub struct RedbStore {
    db: Database,
    token_source: Arc<dyn TokenSource>,
}

impl RedbStore {
    /// 打开（必要时创建）数据库文件
    pub fn open(path: impl AsRef<Path>) -> ItemplateResult<Self> {
        Self::open_with_token_source(path, Arc::new(RandomTokens))
    }

    pub fn open_with_token_source(
        path: impl AsRef<Path>,
        token_source: Arc<dyn TokenSource>,
    ) -> ItemplateResult<Self> {
        let db = Database::create(path.as_ref())?;

        let txn = db.begin_write()?;
        {
            txn.open_table(ITEMS_TABLE)?;
            txn.open_table(TOKENS_TABLE)?;
        }
        txn.commit()?;

        Ok(Self { db, token_source })
    }
}

impl ContentItemStore for RedbStore {
    fn create_item(
        &self,
        content_id: &str,
        element_kind: &ElementKind,
        attribute_kind: &AttributeKind,
        value: &str,
    ) -> ItemplateResult<ContentItem> {
        let token = self.token_source.next_token();

        let txn = self.db.begin_write()?;
        let created = {
            let mut tokens = txn.open_table(TOKENS_TABLE)?;
            let exists = tokens.get(token.as_u128())?.is_some();

            if exists {
                None
            } else {
                let mut items = txn.open_table(ITEMS_TABLE)?;

                let item_id = match items.range((content_id, 0)..=(content_id, u64::MAX))?.next_back() {
                    Some(entry) => {
                        let (key, _) = entry?;
                        key.value().1 + 1
                    }
                    None => 1,
                };

                let item = ContentItem::new(
                    content_id,
                    item_id,
                    token,
                    element_kind.clone(),
                    attribute_kind.clone(),
                    value,
                );
                let record = serde_json::to_vec(&item)?;

                items.insert((content_id, item_id), record.as_slice())?;
                tokens.insert(token.as_u128(), (content_id, item_id))?;

                Some(item)
            }
        };

        match created {
            Some(item) => {
                txn.commit()?;
                Ok(item)
            }
            None => {
                txn.abort()?;
                Err(ItemplateError::TokenCollision { token })
            }
        }
    }

    fn list_items_for(&self, content_id: &str) -> ItemplateResult<Vec<ContentItem>> {
        let txn = self.db.begin_read()?;
        let items = txn.open_table(ITEMS_TABLE)?;

        let mut result: Vec<ContentItem> = vec![];
        for entry in items.range((content_id, 0)..=(content_id, u64::MAX))? {
            let (_, record) = entry?;
            result.push(serde_json::from_slice(record.value())?);
        }

        Ok(result)
    }
}
