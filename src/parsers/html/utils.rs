/// ASCII 空白字符
pub const WHITESPACES: &[char] = &[' ', '\t', '\n', '\x0c', '\r'];

/// srcset 条目之间的分隔符，也是还原时使用的规范写法
pub const SRCSET_SEPARATOR: &str = ", ";

/// 检查字符是否为 ASCII 空白
pub fn is_whitespace(c: char) -> bool {
    WHITESPACES.contains(&c)
}
