//! 模板构建器
//!
//! 正向构建把片段中属于内容项的属性值替换成占位符 `<prefix><uuid>`，
//! 逆向还原把模板中的占位符替换回内容项的原值。
//!
//! ## 匹配规则
//!
//! 替换以属性值为单位进行，从不在原文中做子串搜索：只有与某个属性值
//! 或 srcset 中某个 URL 完全相等的内容项才会替换该位置。因此短值不会
//! 破坏包含它的长值（`cat` 与 `cat picture`、`/a` 与 `/a/b`）。
//!
//! 内容项按值长度降序、`item_id` 升序依次认领位置：
//!
//! 1. 每个内容项先认领第一个元素种类和属性种类都一致的位置
//! 2. 剩余位置由值相同的第一个内容项认领（同值去重后共享一个令牌）
//!
//! 一个 srcset 的整体值与其中的 URL 互斥：整体被认领后其中的 URL
//! 不再参与匹配，反之亦然。
//!
//! ## srcset 输出
//!
//! 没有发生替换的 srcset 值逐字节保留；发生替换的值按
//! [`join_srcset`] 的规范写法重新拼接。

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Range;

use serde::Serialize;
use uuid::Uuid;

use crate::config::ExtractionConfig;
use crate::core::{AttributeKind, ContentItem, ElementKind};
use crate::parsers::html::{
    join_srcset, parse_srcset, AttributeExtractor, Extraction, SrcSetItem, SRCSET_SEPARATOR,
};

/// 内容项未能替换的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// 值为空，没有可替换的内容
    EmptyValue,
    /// 片段中没有与之相等的属性值
    NotFound,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MissReason::EmptyValue => write!(f, "empty value"),
            MissReason::NotFound => write!(f, "value not found"),
        }
    }
}

/// 一个未能替换的内容项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionMiss {
    pub item_id: u64,
    pub token: Uuid,
    pub element_kind: ElementKind,
    pub attribute_kind: AttributeKind,
    pub reason: MissReason,
}

/// 正向构建结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateOutcome {
    /// 模板正文
    pub body: String,
    /// 被替换的位置数（一个内容项可以替换多个位置）
    pub substitutions: usize,
    /// 按 `item_id` 排序的未替换内容项
    pub misses: Vec<SubstitutionMiss>,
}

impl TemplateOutcome {
    pub fn is_complete(&self) -> bool {
        self.misses.is_empty()
    }
}

/// 逆向还原结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub body: String,
    /// 被还原的占位符数
    pub restored: usize,
    /// 令牌不属于任何内容项的占位符，原样留在正文中
    pub unresolved: Vec<String>,
}

/// 可被内容项认领的位置
struct Slot<'b> {
    site: usize,
    text: &'b str,
    /// 整个属性值，而不是 srcset 中的一个 URL
    whole: bool,
    owner: Option<usize>,
}

/// 一个属性实例
struct Site<'b> {
    extraction: Extraction<'b>,
    /// srcset 条目，其他属性为空
    entries: Vec<SrcSetItem<'b>>,
    /// 第一个槽位是整个值，其余依次对应 `entries`
    slots: Range<usize>,
}

enum Lookup<'i> {
    /// 不是占位符
    Plain,
    Known(&'i ContentItem),
    Unknown,
}

/// 模板构建器
pub struct TemplateBuilder<'c> {
    config: &'c ExtractionConfig,
    only: Option<ElementKind>,
}

impl<'c> TemplateBuilder<'c> {
    pub fn new(config: &'c ExtractionConfig) -> Self {
        TemplateBuilder { config, only: None }
    }

    /// 只处理指定种类的元素
    pub fn restricted_to(mut self, only: Option<ElementKind>) -> Self {
        self.only = only;
        self
    }

    fn extractor(&self) -> AttributeExtractor<'c> {
        AttributeExtractor::new(self.config).restricted_to(self.only.clone())
    }

    fn sites<'b>(&self, body: &'b str) -> (Vec<Site<'b>>, Vec<Slot<'b>>) {
        let mut sites: Vec<Site<'b>> = vec![];
        let mut slots: Vec<Slot<'b>> = vec![];

        for extraction in self.extractor().extract(body) {
            let site = sites.len();
            let start = slots.len();

            slots.push(Slot {
                site,
                text: extraction.value,
                whole: true,
                owner: None,
            });

            let entries = if extraction.attribute_kind.is_srcset() {
                parse_srcset(extraction.value)
            } else {
                vec![]
            };
            for entry in &entries {
                slots.push(Slot {
                    site,
                    text: entry.path,
                    whole: false,
                    owner: None,
                });
            }

            sites.push(Site {
                extraction,
                entries,
                slots: start..slots.len(),
            });
        }

        (sites, slots)
    }

    /// 用占位符替换片段中属于内容项的属性值
    pub fn build(&self, body: &str, items: &[ContentItem]) -> TemplateOutcome {
        let (sites, mut slots) = self.sites(body);

        let mut order: Vec<&ContentItem> = items.iter().collect();
        order.sort_by(|a, b| {
            b.value
                .len()
                .cmp(&a.value.len())
                .then(a.item_id.cmp(&b.item_id))
        });

        let mut by_text: HashMap<&str, Vec<usize>> = HashMap::new();
        for (index, slot) in slots.iter().enumerate() {
            by_text.entry(slot.text).or_default().push(index);
        }

        let mut claims = vec![0usize; order.len()];

        // 种类一致的第一个位置
        for (rank, item) in order.iter().enumerate() {
            if item.value.is_empty() {
                continue;
            }
            let Some(candidates) = by_text.get(item.value.as_str()) else {
                continue;
            };

            let found = candidates.iter().copied().find(|&index| {
                let extraction = &sites[slots[index].site].extraction;
                extraction.element_kind == item.element_kind
                    && extraction.attribute_kind == item.attribute_kind
                    && claimable(&sites, &slots, index)
            });
            if let Some(index) = found {
                slots[index].owner = Some(rank);
                claims[rank] += 1;
            }
        }

        // 其余同值位置。必须在种类一致的一轮之后：整个 srcset 的文本可能与
        // 其他属性的值相同，先占下的 URL 位置使其不再可被整体占用
        for (rank, item) in order.iter().enumerate() {
            if item.value.is_empty() {
                continue;
            }
            let Some(candidates) = by_text.get(item.value.as_str()) else {
                continue;
            };

            for &index in candidates {
                if claimable(&sites, &slots, index) {
                    slots[index].owner = Some(rank);
                    claims[rank] += 1;
                }
            }
        }

        let placeholders: Vec<String> = order
            .iter()
            .map(|item| self.config.placeholder(&item.token))
            .collect();

        let mut output = String::with_capacity(body.len());
        let mut cursor = 0;

        for site in &sites {
            let whole = &slots[site.slots.start];
            let replacement = if let Some(rank) = whole.owner {
                Some(placeholders[rank].clone())
            } else if slots[site.slots.clone()].iter().any(|slot| slot.owner.is_some()) {
                let entries: Vec<SrcSetItem<'_>> = site
                    .entries
                    .iter()
                    .zip(&slots[site.slots.start + 1..site.slots.end])
                    .map(|(entry, slot)| match slot.owner {
                        Some(rank) => SrcSetItem {
                            path: placeholders[rank].as_str(),
                            descriptor: entry.descriptor,
                        },
                        None => *entry,
                    })
                    .collect();
                Some(join_for(&site.extraction, &entries))
            } else {
                None
            };

            if let Some(replacement) = replacement {
                output.push_str(&body[cursor..site.extraction.span.start]);
                output.push_str(&replacement);
                cursor = site.extraction.span.end;
            }
        }
        output.push_str(&body[cursor..]);

        let substitutions = claims.iter().sum();

        let mut misses: Vec<SubstitutionMiss> = order
            .iter()
            .zip(&claims)
            .filter(|(_, &count)| count == 0)
            .map(|(item, _)| SubstitutionMiss {
                item_id: item.item_id,
                token: item.token,
                element_kind: item.element_kind.clone(),
                attribute_kind: item.attribute_kind.clone(),
                reason: if item.value.is_empty() {
                    MissReason::EmptyValue
                } else {
                    MissReason::NotFound
                },
            })
            .collect();
        misses.sort_by_key(|miss| miss.item_id);

        for miss in &misses {
            tracing::debug!(item_id = miss.item_id, reason = %miss.reason, "content item not substituted");
        }

        metrics::counter!("itemplate_substitutions_total").increment(substitutions as u64);
        metrics::counter!("itemplate_substitution_misses_total").increment(misses.len() as u64);

        TemplateOutcome {
            body: output,
            substitutions,
            misses,
        }
    }

    fn lookup<'i>(&self, text: &str, by_token: &HashMap<Uuid, &'i ContentItem>) -> Lookup<'i> {
        match self.config.parse_placeholder(text) {
            None => Lookup::Plain,
            Some(token) => by_token
                .get(&token)
                .map_or(Lookup::Unknown, |&item| Lookup::Known(item)),
        }
    }

    /// 把模板中的占位符还原成内容项的原值
    ///
    /// 只有占据整个属性值或整个 srcset URL 的占位符会被识别。
    pub fn restore(&self, template: &str, items: &[ContentItem]) -> RestoreOutcome {
        let by_token: HashMap<Uuid, &ContentItem> =
            items.iter().map(|item| (item.token, item)).collect();

        let mut output = String::with_capacity(template.len());
        let mut cursor = 0;
        let mut restored: usize = 0;
        let mut unresolved: Vec<String> = vec![];

        for extraction in self.extractor().extract(template) {
            let replacement = match self.lookup(extraction.value, &by_token) {
                Lookup::Known(item) => {
                    restored += 1;
                    Some(item.value.clone())
                }
                Lookup::Unknown => {
                    unresolved.push(extraction.value.to_string());
                    None
                }
                Lookup::Plain if extraction.attribute_kind.is_srcset() => {
                    let mut changed = false;
                    let entries: Vec<SrcSetItem<'_>> = parse_srcset(extraction.value)
                        .into_iter()
                        .map(|entry| match self.lookup(entry.path, &by_token) {
                            Lookup::Known(item) => {
                                restored += 1;
                                changed = true;
                                SrcSetItem {
                                    path: item.value.as_str(),
                                    descriptor: entry.descriptor,
                                }
                            }
                            Lookup::Unknown => {
                                unresolved.push(entry.path.to_string());
                                entry
                            }
                            Lookup::Plain => entry,
                        })
                        .collect();
                    changed.then(|| join_for(&extraction, &entries))
                }
                Lookup::Plain => None,
            };

            if let Some(replacement) = replacement {
                output.push_str(&template[cursor..extraction.span.start]);
                output.push_str(&replacement);
                cursor = extraction.span.end;
            }
        }
        output.push_str(&template[cursor..]);

        if !unresolved.is_empty() {
            tracing::warn!(count = unresolved.len(), "template contains unknown placeholders");
        }
        metrics::counter!("itemplate_placeholders_restored_total").increment(restored as u64);

        RestoreOutcome {
            body: output,
            restored,
            unresolved,
        }
    }

    /// 模板中仍以原值出现在属性位置上的内容项
    ///
    /// 检查被跟踪的属性值以及 srcset 中的每个 URL，返回升序的 `item_id`。
    pub fn leaked_items(&self, template: &str, items: &[ContentItem]) -> Vec<u64> {
        let mut by_value: HashMap<&str, u64> = HashMap::new();
        for item in items.iter().filter(|item| !item.value.is_empty()) {
            by_value.entry(item.value.as_str()).or_insert(item.item_id);
        }

        let mut leaked: BTreeSet<u64> = BTreeSet::new();
        for extraction in self.extractor().extract(template) {
            let mut texts = vec![extraction.value];
            if extraction.attribute_kind.is_srcset() {
                texts.extend(parse_srcset(extraction.value).iter().map(|entry| entry.path));
            }

            for text in texts {
                if let Some(&item_id) = by_value.get(text) {
                    leaked.insert(item_id);
                }
            }
        }

        leaked.into_iter().collect()
    }

    /// 规范化片段中的全部 srcset 值，其余内容不变
    ///
    /// 用于比较原文与还原结果：发生过替换的 srcset 只能还原到规范写法。
    pub fn normalize(&self, body: &str) -> String {
        let mut output = String::with_capacity(body.len());
        let mut cursor = 0;

        for extraction in self.extractor().extract(body) {
            if !extraction.attribute_kind.is_srcset() {
                continue;
            }

            let normalized = join_for(&extraction, &parse_srcset(extraction.value));
            if normalized != extraction.value {
                output.push_str(&body[cursor..extraction.span.start]);
                output.push_str(&normalized);
                cursor = extraction.span.end;
            }
        }
        output.push_str(&body[cursor..]);

        output
    }
}

fn claimable(sites: &[Site<'_>], slots: &[Slot<'_>], index: usize) -> bool {
    let slot = &slots[index];
    if slot.owner.is_some() {
        return false;
    }

    let range = sites[slot.site].slots.clone();
    if slot.whole {
        slots[range].iter().all(|other| other.owner.is_none())
    } else {
        slots[range.start].owner.is_none()
    }
}

/// 拼接 srcset 条目；无引号的属性值中不能出现空白
fn join_for(extraction: &Extraction<'_>, entries: &[SrcSetItem<'_>]) -> String {
    let joined = join_srcset(entries);
    match extraction.quote {
        Some(_) => joined,
        None => joined.replace(SRCSET_SEPARATOR, ","),
    }
}
