use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::builders::template::{RestoreOutcome, TemplateBuilder, TemplateOutcome};
use crate::config::ExtractionConfig;
use crate::error::ItemplateResult;
use crate::parsers::html::{parse_srcset, AttributeExtractor};
use crate::store::ContentItemStore;

/// Kind of HTML element an attribute value was found on
///
/// Element names are matched case-insensitively; anything that is not one of
/// the well-known kinds is kept verbatim (lowercased) in `Other`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    A,
    Img,
    Link,
    Source,
    Other(String),
}

impl ElementKind {
    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::A => "a",
            ElementKind::Img => "img",
            ElementKind::Link => "link",
            ElementKind::Source => "source",
            ElementKind::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for ElementKind {
    fn from(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "a" => ElementKind::A,
            "img" => ElementKind::Img,
            "link" => ElementKind::Link,
            "source" => ElementKind::Source,
            _ => ElementKind::Other(name),
        }
    }
}

impl From<String> for ElementKind {
    fn from(name: String) -> Self {
        ElementKind::from(name.as_str())
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of attribute an extracted value belongs to
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttributeKind {
    Alt,
    Href,
    Sizes,
    Src,
    Srcset,
    Title,
    Other(String),
}

impl AttributeKind {
    pub fn as_str(&self) -> &str {
        match self {
            AttributeKind::Alt => "alt",
            AttributeKind::Href => "href",
            AttributeKind::Sizes => "sizes",
            AttributeKind::Src => "src",
            AttributeKind::Srcset => "srcset",
            AttributeKind::Title => "title",
            AttributeKind::Other(name) => name.as_str(),
        }
    }

    /// `srcset` values are lists and get decomposed per URL
    pub fn is_srcset(&self) -> bool {
        *self == AttributeKind::Srcset
    }
}

impl From<&str> for AttributeKind {
    fn from(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "alt" => AttributeKind::Alt,
            "href" => AttributeKind::Href,
            "sizes" => AttributeKind::Sizes,
            "src" => AttributeKind::Src,
            "srcset" => AttributeKind::Srcset,
            "title" => AttributeKind::Title,
            _ => AttributeKind::Other(name),
        }
    }
}

impl From<String> for AttributeKind {
    fn from(name: String) -> Self {
        AttributeKind::from(name.as_str())
    }
}

impl From<AttributeKind> for String {
    fn from(kind: AttributeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One HTML fragment under analysis
///
/// The body is never mutated; templating produces a new string so the
/// original stays available for round-trip verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentElement {
    pub content_id: String,
    pub body: String,
    /// Narrows extraction to one element kind when set
    pub element_kind: Option<ElementKind>,
}

impl ContentElement {
    pub fn new(content_id: impl Into<String>, body: impl Into<String>) -> Self {
        ContentElement {
            content_id: content_id.into(),
            body: body.into(),
            element_kind: None,
        }
    }

    pub fn with_element_kind(mut self, element_kind: ElementKind) -> Self {
        self.element_kind = Some(element_kind);
        self
    }
}

/// One extracted attribute value, addressable by its token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Sequence number within `content_id`, starting at 1
    pub item_id: u64,
    pub content_id: String,
    pub token: Uuid,
    pub element_kind: ElementKind,
    pub attribute_kind: AttributeKind,
    /// Exact original value, whitespace included
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(
        content_id: &str,
        item_id: u64,
        token: Uuid,
        element_kind: ElementKind,
        attribute_kind: AttributeKind,
        value: &str,
    ) -> Self {
        let now = Utc::now();
        ContentItem {
            item_id,
            content_id: content_id.to_string(),
            token,
            element_kind,
            attribute_kind,
            value: value.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of running extraction and templating for one element
#[derive(Clone, Debug)]
pub struct ElementOutcome {
    /// Every item of the element, ordered by `item_id`
    pub items: Vec<ContentItem>,
    /// Items created by this call (the rest were already stored)
    pub created: usize,
    pub template: TemplateOutcome,
}

/// Registers every extracted attribute value of `element` as a content item
///
/// Values are deduplicated per `content_id`: byte-identical values share one
/// item (and therefore one token), including a `src` and a `srcset` URL with
/// the same text. `srcset` values are decomposed and each URL becomes its own
/// item. Items already stored for the `content_id` are reused, which is the
/// only way to keep placeholders stable across runs: extracting the same body
/// against an empty store always yields fresh tokens.
pub fn itemize<S: ContentItemStore + ?Sized>(
    store: &S,
    config: &ExtractionConfig,
    element: &ContentElement,
) -> ItemplateResult<(Vec<ContentItem>, usize)> {
    let mut items = store.list_items_for(&element.content_id)?;
    let mut by_value: HashMap<String, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.value.clone(), i))
        .collect();
    let mut created: usize = 0;

    let extractor = AttributeExtractor::new(config).restricted_to(element.element_kind.clone());

    for extraction in extractor.extract(&element.body) {
        let mut values: Vec<&str> = vec![];

        if extraction.attribute_kind.is_srcset() {
            values.extend(parse_srcset(extraction.value).iter().map(|entry| entry.path));
        }

        // Blank srcset or any other attribute: the raw value is the item
        if values.is_empty() {
            values.push(extraction.value);
        }

        for value in values {
            if by_value.contains_key(value) {
                continue;
            }

            let item = store.create_item(
                &element.content_id,
                &extraction.element_kind,
                &extraction.attribute_kind,
                value,
            )?;
            tracing::debug!(
                content_id = %element.content_id,
                item_id = item.item_id,
                attribute = %item.attribute_kind,
                "created content item"
            );
            by_value.insert(value.to_string(), items.len());
            items.push(item);
            created += 1;
        }
    }

    metrics::counter!("itemplate_items_created_total").increment(created as u64);

    Ok((items, created))
}

/// Extracts, stores and templates one element
pub fn process_element<S: ContentItemStore + ?Sized>(
    store: &S,
    config: &ExtractionConfig,
    element: &ContentElement,
) -> ItemplateResult<ElementOutcome> {
    let (items, created) = itemize(store, config, element)?;

    let builder = TemplateBuilder::new(config).restricted_to(element.element_kind.clone());
    let template = builder.build(&element.body, &items);

    Ok(ElementOutcome {
        items,
        created,
        template,
    })
}

/// Rebuilds the original body of `content_id` from a template and the stored items
pub fn restore_element<S: ContentItemStore + ?Sized>(
    store: &S,
    config: &ExtractionConfig,
    content_id: &str,
    template: &str,
) -> ItemplateResult<RestoreOutcome> {
    let items = store.list_items_for(content_id)?;
    Ok(TemplateBuilder::new(config).restore(template, &items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_kinds_are_case_insensitive() {
        assert_eq!(ElementKind::from("IMG"), ElementKind::Img);
        assert_eq!(AttributeKind::from("SrcSet"), AttributeKind::Srcset);
        assert_eq!(
            AttributeKind::from("data-src"),
            AttributeKind::Other("data-src".to_string())
        );
        assert_eq!(ElementKind::from("Video").as_str(), "video");
    }

    #[test]
    fn test_kinds_serialize_as_strings() {
        let json = serde_json::to_string(&AttributeKind::Srcset).unwrap();
        assert_eq!(json, "\"srcset\"");

        let kind: ElementKind = serde_json::from_str("\"picture\"").unwrap();
        assert_eq!(kind, ElementKind::Other("picture".to_string()));
    }

    #[test]
    fn test_itemize_dedupes_by_value() {
        let store = MemoryStore::new();
        let config = ExtractionConfig::default();
        let element = ContentElement::new(
            "page-1",
            r#"<img src="x.jpg" alt="Cat" srcset="x.jpg 1x, y.jpg 2x">"#,
        );

        let (items, created) = itemize(&store, &config, &element).unwrap();

        assert_eq!(created, 3);
        let values: Vec<&str> = items.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(values, vec!["x.jpg", "Cat", "y.jpg"]);
        assert_eq!(items[0].attribute_kind, AttributeKind::Src);
        assert_eq!(items[2].attribute_kind, AttributeKind::Srcset);
        assert_eq!(
            items.iter().map(|i| i.item_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_itemize_reuses_stored_items() {
        let store = MemoryStore::new();
        let config = ExtractionConfig::default();
        let element = ContentElement::new("page-1", r#"<a href="/about" title="About">x</a>"#);

        let (first, created_first) = itemize(&store, &config, &element).unwrap();
        let (second, created_second) = itemize(&store, &config, &element).unwrap();

        assert_eq!(created_first, 2);
        assert_eq!(created_second, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_element_kind_hint_narrows_extraction() {
        let store = MemoryStore::new();
        let config = ExtractionConfig::default();
        let element = ContentElement::new(
            "page-1",
            r#"<a href="/home"><img src="logo.png" alt="Logo"></a>"#,
        )
        .with_element_kind(ElementKind::Img);

        let outcome = process_element(&store, &config, &element).unwrap();

        assert_eq!(outcome.items.len(), 2);
        assert!(outcome.template.body.contains(r#"href="/home""#));
        assert!(!outcome.template.body.contains("logo.png"));
    }
}
