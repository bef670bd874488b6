//! # 内容项存储
//!
//! 引擎通过 `ContentItemStore` 特性访问持久层，不依赖任何全局连接：
//! 每次抽取或模板化调用都显式传入存储句柄。所有操作都限定在单个 `content_id` 内。
//!
//! # 模块组织
//!
//! - `memory` - 基于 dashmap 的内存存储
//! - `disk` - 基于 redb 的磁盘存储

pub mod disk;
pub mod memory;

use std::sync::Arc;

use uuid::Uuid;

use crate::config::StoreConfig;
use crate::core::{AttributeKind, ContentItem, ElementKind};
use crate::error::ItemplateResult;

pub use disk::RedbStore;
pub use memory::MemoryStore;

/// 令牌来源
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> Uuid;
}

/// 随机 UUID v4 令牌
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// 内容项存储契约
///
/// 实现必须保证 `(item_id, content_id)` 唯一、令牌全局唯一。
/// 新令牌已存在时 `create_item` 返回 `TokenCollision`，不得悄悄换一个令牌重试。
/// 存储自身的 IO 错误原样返回，引擎不做自动重试。
pub trait ContentItemStore: Send + Sync {
    /// 创建内容项，分配 `item_id` 与令牌
    fn create_item(
        &self,
        content_id: &str,
        element_kind: &ElementKind,
        attribute_kind: &AttributeKind,
        value: &str,
    ) -> ItemplateResult<ContentItem>;

    /// 按 `item_id` 顺序列出内容项
    fn list_items_for(&self, content_id: &str) -> ItemplateResult<Vec<ContentItem>>;
}

impl<S: ContentItemStore + ?Sized> ContentItemStore for Arc<S> {
    fn create_item(
        &self,
        content_id: &str,
        element_kind: &ElementKind,
        attribute_kind: &AttributeKind,
        value: &str,
    ) -> ItemplateResult<ContentItem> {
        (**self).create_item(content_id, element_kind, attribute_kind, value)
    }

    fn list_items_for(&self, content_id: &str) -> ItemplateResult<Vec<ContentItem>> {
        (**self).list_items_for(content_id)
    }
}

/// 按配置打开存储：设置了路径时使用 redb，否则使用内存存储
pub fn open_store(config: &StoreConfig) -> ItemplateResult<Box<dyn ContentItemStore>> {
    match &config.path {
        Some(path) => {
            let path = shellexpand::tilde(path);
            tracing::debug!("打开 redb 存储: {}", path);
            Ok(Box::new(RedbStore::open(&*path)?))
        }
        None => Ok(Box::new(MemoryStore::new())),
    }
}
