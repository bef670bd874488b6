//! srcset 分解器
//!
//! 拆分和拼接 `<img>` / `<source>` 元素 `srcset` 属性中逗号分隔的
//! `<url> <descriptor>` 列表。描述符（如 `768w`、`2x`）原样保留，从不被替换。
//!
//! ## 规范化
//!
//! 拼接总是使用 `", "` 分隔条目、单个空格分隔 URL 与描述符。
//! 因此 `parse_srcset` 之后再 `join_srcset` 是**规范化**而不是逐字节还原：
//! 原值中多余的空白、换行或末尾逗号不会被保留。需要逐字节还原的调用方
//! 应避免改写未发生替换的 srcset 值。
//!
//! ## 使用示例
//!
//! ```rust
//! use itemplate::parsers::html::srcset::{join_srcset, parse_srcset};
//!
//! let items = parse_srcset("small.jpg 480w,\n   large.jpg 800w");
//! assert_eq!(items.len(), 2);
//! assert_eq!(join_srcset(&items), "small.jpg 480w, large.jpg 800w");
//! ```

use super::utils::{is_whitespace, SRCSET_SEPARATOR};

/// SrcSet 属性项目结构
///
/// 表示 `srcset` 属性中的单个图片项目，包含图片路径和对应的描述符。
///
/// ## 字段说明
///
/// - `path`: 图片文件的路径或URL
/// - `descriptor`: 宽度（如 "480w"）或像素密度（如 "2x"）描述符，可能为空
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrcSetItem<'a> {
    /// 图片文件的路径或URL
    pub path: &'a str,
    /// 图片描述符，没有描述符时为空字符串
    pub descriptor: &'a str,
}

/// 解析 `srcset` 属性值
///
/// 按逗号分割，去除每个条目两端空白并丢弃空条目，
/// 再在第一段连续空白处把条目拆成 `(path, descriptor)`。
///
/// ## 使用示例
///
/// ```rust
/// # use itemplate::parsers::html::srcset::parse_srcset;
/// let items = parse_srcset("a.jpg 200w, b.jpg, c.jpg 2x");
/// assert_eq!(items[0].descriptor, "200w");
/// assert_eq!(items[1].descriptor, "");
/// assert_eq!(items[2].path, "c.jpg");
/// ```
pub fn parse_srcset(srcset: &str) -> Vec<SrcSetItem<'_>> {
    srcset
        .split(',')
        .map(|entry| entry.trim_matches(is_whitespace))
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.find(is_whitespace) {
            Some(boundary) => SrcSetItem {
                path: &entry[..boundary],
                descriptor: entry[boundary..].trim_start_matches(is_whitespace),
            },
            None => SrcSetItem {
                path: entry,
                descriptor: "",
            },
        })
        .collect()
}

/// 按原顺序拼接 srcset 条目
///
/// 输出格式固定为 `url descriptor, url descriptor, …`，见模块文档中的规范化说明。
pub fn join_srcset(items: &[SrcSetItem<'_>]) -> String {
    let mut result: String = String::new();

    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            result.push_str(SRCSET_SEPARATOR);
        }

        result.push_str(item.path);

        // 添加描述符（如尺寸或密度信息）
        if !item.descriptor.is_empty() {
            result.push(' ');
            result.push_str(item.descriptor);
        }
    }

    result
}

/// 规范化 srcset 值，等价于先解析再拼接
pub fn normalize_srcset(srcset: &str) -> String {
    join_srcset(&parse_srcset(srcset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_width_descriptors() {
        let items = parse_srcset("a.jpg 200w, b.jpg 400w, c.jpg 800w");

        assert_eq!(
            items,
            vec![
                SrcSetItem { path: "a.jpg", descriptor: "200w" },
                SrcSetItem { path: "b.jpg", descriptor: "400w" },
                SrcSetItem { path: "c.jpg", descriptor: "800w" },
            ]
        );
    }

    #[test]
    fn test_parse_irregular_whitespace() {
        let items = parse_srcset("\n  x.jpg \t 1x ,y.jpg\n2x,, ");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], SrcSetItem { path: "x.jpg", descriptor: "1x" });
        assert_eq!(items[1], SrcSetItem { path: "y.jpg", descriptor: "2x" });
    }

    #[test]
    fn test_parse_keeps_descriptor_verbatim() {
        let items = parse_srcset("hero.webp 100w  2x");
        assert_eq!(items[0].descriptor, "100w  2x");
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_srcset("").is_empty());
        assert!(parse_srcset(" , ,").is_empty());
    }

    #[test]
    fn test_join_without_descriptor() {
        let items = parse_srcset("only.png");
        assert_eq!(join_srcset(&items), "only.png");
    }

    #[test]
    fn test_normalize_is_stable() {
        let once = normalize_srcset("a.jpg   1x,b.jpg 2x,");
        assert_eq!(once, "a.jpg 1x, b.jpg 2x");
        assert_eq!(normalize_srcset(&once), once);
    }
}
