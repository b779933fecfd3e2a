//! 尽力而为的 JSON 结构修复
//!
//! 针对模型输出中常见的问题：
//! - 字符串内未转义的双引号、原始换行
//! - 多余的逗号（尾随逗号、重复逗号）
//! - 相邻对象之间缺失的逗号
//! - 输出被截断导致的未闭合字符串 / 括号
//!
//! 修复结果不保证一定是合法 JSON，调用方仍需严格解析。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object,
    Array,
}

impl Frame {
    fn closer(self) -> char {
        match self {
            Frame::Object => '}',
            Frame::Array => ']',
        }
    }
}

/// 修复 JSON 文本
pub fn repair_json(input: &str) -> String {
    Repairer::new(input).run()
}

struct Repairer {
    chars: Vec<char>,
    out: String,
    stack: Vec<Frame>,
    in_string: bool,
    string_is_key: bool,
    awaiting_colon: bool,
}

impl Repairer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            out: String::with_capacity(input.len() + 16),
            stack: Vec::new(),
            in_string: false,
            string_is_key: false,
            awaiting_colon: false,
        }
    }

    fn run(mut self) -> String {
        let mut i = 0;
        while i < self.chars.len() {
            i = if self.in_string {
                self.string_char(i)
            } else {
                self.structural_char(i)
            };
        }

        if self.in_string {
            self.out.push('"');
            self.in_string = false;
            if self.string_is_key {
                self.awaiting_colon = true;
            }
        }
        while let Some(frame) = self.stack.pop() {
            self.close_dangling(frame);
            self.out.push(frame.closer());
        }
        self.out
    }

    /// 处理字符串内部的字符，返回下一个位置
    fn string_char(&mut self, i: usize) -> usize {
        let c = self.chars[i];
        match c {
            '\\' => {
                if self.is_valid_escape(i + 1) {
                    self.out.push('\\');
                    self.out.push(self.chars[i + 1]);
                    return i + 2;
                }
                self.out.push_str("\\\\");
            }
            '"' => {
                if self.string_terminates(i + 1) {
                    self.out.push('"');
                    self.in_string = false;
                    self.awaiting_colon = self.string_is_key;
                } else {
                    self.out.push_str("\\\"");
                }
            }
            '\n' => self.out.push_str("\\n"),
            '\r' => self.out.push_str("\\r"),
            '\t' => self.out.push_str("\\t"),
            c if (c as u32) < 0x20 => self.out.push_str(&format!("\\u{:04x}", c as u32)),
            c => self.out.push(c),
        }
        i + 1
    }

    /// 处理字符串外部的字符，返回下一个位置
    fn structural_char(&mut self, i: usize) -> usize {
        let c = self.chars[i];
        if !c.is_whitespace() && c != ':' && c != '}' {
            self.awaiting_colon = false;
        }
        match c {
            '"' => {
                self.insert_missing_comma();
                self.string_is_key = self.stack.last() == Some(&Frame::Object)
                    && matches!(self.last_significant(), Some('{') | Some(','));
                self.out.push('"');
                self.in_string = true;
            }
            '{' | '[' => {
                self.insert_missing_comma();
                self.stack.push(if c == '{' { Frame::Object } else { Frame::Array });
                self.out.push(c);
            }
            '}' | ']' => {
                let frame = if c == '}' { Frame::Object } else { Frame::Array };
                // 多余的右括号直接丢弃
                if self.stack.contains(&frame) {
                    while let Some(top) = self.stack.pop() {
                        self.close_dangling(top);
                        if top == frame {
                            self.out.push(c);
                            break;
                        }
                        self.out.push(top.closer());
                    }
                }
            }
            ':' => {
                self.awaiting_colon = false;
                self.out.push(':');
            }
            ',' => {
                if !matches!(
                    self.last_significant(),
                    None | Some(',') | Some('{') | Some('[')
                ) {
                    self.out.push(',');
                }
            }
            c => self.out.push(c),
        }
        i + 1
    }

    /// 关闭容器前清理悬空的逗号 / 冒号 / 键
    fn close_dangling(&mut self, frame: Frame) {
        self.trim_trailing_whitespace();
        if self.out.ends_with(',') {
            self.out.pop();
            self.trim_trailing_whitespace();
        }
        if frame == Frame::Object {
            if self.out.ends_with(':') {
                self.out.push_str("null");
            } else if self.awaiting_colon {
                self.out.push_str(":null");
            }
        }
        self.awaiting_colon = false;
    }

    fn trim_trailing_whitespace(&mut self) {
        while self.out.ends_with(char::is_whitespace) {
            self.out.pop();
        }
    }

    /// 前一个值已结束而新值开始时补上逗号
    fn insert_missing_comma(&mut self) {
        if matches!(self.last_significant(), Some('}') | Some(']') | Some('"')) {
            self.out.push(',');
        }
    }

    fn last_significant(&self) -> Option<char> {
        self.out.chars().rev().find(|c| !c.is_whitespace())
    }

    fn next_significant(&self, from: usize) -> Option<(usize, char)> {
        self.chars
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, c)| !c.is_whitespace())
            .map(|(i, c)| (i, *c))
    }

    fn is_valid_escape(&self, at: usize) -> bool {
        match self.chars.get(at) {
            Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => true,
            Some('u') => {
                self.chars.len() >= at + 5
                    && self.chars[at + 1..at + 5].iter().all(|c| c.is_ascii_hexdigit())
            }
            _ => false,
        }
    }

    /// 判断字符串内的双引号是结束引号还是内容中未转义的引号
    fn string_terminates(&self, from: usize) -> bool {
        let container = self.stack.last().copied();
        match self.next_significant(from) {
            None => true,
            Some((_, ':')) => self.string_is_key,
            Some((_, '}')) => container == Some(Frame::Object),
            Some((_, ']')) => container == Some(Frame::Array),
            Some((comma, ',')) => self.string_is_key || self.value_follows(comma + 1),
            Some(_) => false,
        }
    }

    /// 逗号之后是否像是一个新的 JSON 值 / 键
    fn value_follows(&self, from: usize) -> bool {
        match self.next_significant(from) {
            None => true,
            Some((_, '"' | '{' | '[' | ']' | '}' | '-')) => true,
            Some((_, c)) if c.is_ascii_digit() => true,
            Some((at, _)) => ["true", "false", "null"].iter().any(|literal| {
                let end = at + literal.len();
                end <= self.chars.len()
                    && self.chars[at..end].iter().copied().eq(literal.chars())
                    && self
                        .chars
                        .get(end)
                        .map_or(true, |c| !c.is_alphanumeric())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn repaired(input: &str) -> Value {
        let text = repair_json(input);
        serde_json::from_str(&text).unwrap_or_else(|e| panic!("{} -> {}: {}", input, text, e))
    }

    #[test]
    fn test_valid_json_is_unchanged() {
        let input = r#"[{"type":"paragraph","content":[{"type":"text","text":"a, b"}]}]"#;
        assert_eq!(repair_json(input), input);
    }

    #[test]
    fn test_closes_truncated_brackets() {
        let value = repaired(r#"[{"type":"paragraph","content":[{"type":"text","text":"Hello"}]}"#);
        assert_eq!(value[0]["content"][0]["text"], "Hello");
    }

    #[test]
    fn test_closes_truncated_string() {
        let value = repaired(r#"[{"type":"text","text":"Hel"#);
        assert_eq!(value, json!([{ "type": "text", "text": "Hel" }]));
    }

    #[test]
    fn test_truncated_after_key() {
        let value = repaired(r#"[{"type":"text","text""#);
        assert_eq!(value, json!([{ "type": "text", "text": null }]));

        let value = repaired(r#"[{"type":"text","text":"#);
        assert_eq!(value, json!([{ "type": "text", "text": null }]));
    }

    #[test]
    fn test_removes_trailing_and_duplicate_commas() {
        let value = repaired(r#"[{"a":1,,"b":2,}, ]"#);
        assert_eq!(value, json!([{ "a": 1, "b": 2 }]));
    }

    #[test]
    fn test_escapes_interior_quotes() {
        let value = repaired(r#"[{"text":"He said "hello" to me"}]"#);
        assert_eq!(value[0]["text"], r#"He said "hello" to me"#);

        let value = repaired(r#"[{"text":"a "quoted", then more"}]"#);
        assert_eq!(value[0]["text"], r#"a "quoted", then more"#);
    }

    #[test]
    fn test_escapes_raw_newlines_and_bad_escapes() {
        let value = repaired("[{\"text\":\"line1\nline2 C:\\path\"}]");
        assert_eq!(value[0]["text"], "line1\nline2 C:\\path");
    }

    #[test]
    fn test_inserts_missing_comma_between_objects() {
        let value = repaired(r#"[{"a":1} {"b":2}]"#);
        assert_eq!(value, json!([{ "a": 1 }, { "b": 2 }]));
    }

    #[test]
    fn test_drops_stray_closer_and_fixes_mismatch() {
        let value = repaired(r#"[{"a":[1,2}]"#);
        assert_eq!(value, json!([{ "a": [1, 2] }]));

        let value = repaired(r#"[1]]"#);
        assert_eq!(value, json!([1]));
    }
}
