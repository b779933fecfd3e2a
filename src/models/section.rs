//! 章节定义
//!
//! 章节由一组标题子串（大小写不敏感）和可选的标题级别来定义，
//! 已知章节全部登记在注册表中，启动时校验。

use std::collections::BTreeMap;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::error::SectionError;

/// 内置模板的章节标题子串
static BUILTIN_SECTIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "GHG Inventory" => "GHG Inventory Module",
    "Climate Transparency" => "Climate Transparency in",
    "Adaptation and Vulnerability" => "Adaptation and Vulnerability Module",
    "NDC Tracking" => "NDC Tracking Module",
    "Institutional Framework for Climate Action" => "Institutional Framework for Climate Action",
    "National Policy Framework" => "National Policy Framework",
    "Support Needed and Received" => "Support Needed and Received Module",
    "Key Barriers" => "Key barriers",
    "Other Baseline Initiatives" => "Other baseline initiatives",
    "Official Reporting to the UNFCCC" => "Official reporting to the UNFCCC",
};

/// 章节在文档顶层中的范围 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionRange {
    pub start: usize,
    pub end: usize,
}

impl SectionRange {
    /// 只接受非空范围
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// 单个章节的匹配规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPattern {
    pub substrings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_level: Option<u8>,
}

/// 标题文本与模式的匹配程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeadingMatch {
    Substring,
    Exact,
}

impl SectionPattern {
    /// 判断标题是否匹配（`heading_text` 应已 trim + 小写）
    pub fn match_heading(&self, heading_text: &str, level: u8) -> Option<HeadingMatch> {
        if self.expected_level.is_some_and(|expected| expected != level) {
            return None;
        }

        let mut best = None;
        for pattern in &self.substrings {
            let pattern = pattern.trim().to_lowercase();
            if heading_text == pattern {
                return Some(HeadingMatch::Exact);
            }
            if heading_text.contains(&pattern) {
                best = Some(HeadingMatch::Substring);
            }
        }
        best
    }
}

/// TOML 中的章节条目
#[derive(Debug, Clone, Deserialize)]
struct SectionEntry {
    name: String,
    substrings: Vec<String>,
    #[serde(default)]
    expected_level: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "section")]
    sections: Vec<SectionEntry>,
}

/// 已知章节注册表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRegistry {
    sections: BTreeMap<String, SectionPattern>,
}

impl SectionRegistry {
    /// 内置模板的章节注册表
    pub fn builtin() -> Self {
        let sections = BUILTIN_SECTIONS
            .entries()
            .map(|(name, substring)| {
                (
                    name.to_string(),
                    SectionPattern {
                        substrings: vec![substring.to_string()],
                        expected_level: None,
                    },
                )
            })
            .collect();
        Self { sections }
    }

    /// 由任意条目构建并校验
    pub fn from_patterns(
        patterns: impl IntoIterator<Item = (String, SectionPattern)>,
    ) -> Result<Self, SectionError> {
        let registry = Self {
            sections: patterns.into_iter().collect(),
        };
        registry.validate()?;
        Ok(registry)
    }

    /// 从 TOML 文本加载
    ///
    /// ```toml
    /// [[section]]
    /// name = "GHG Inventory"
    /// substrings = ["GHG Inventory Module"]
    /// expected_level = 2
    /// ```
    pub fn from_toml_str(text: &str) -> crate::error::AppResult<Self> {
        let file: RegistryFile = toml::from_str(text)?;
        let mut sections = BTreeMap::new();
        for entry in file.sections {
            if sections.contains_key(&entry.name) {
                return Err(SectionError::InvalidPattern {
                    section: entry.name,
                    reason: "章节名重复".to_string(),
                }
                .into());
            }
            sections.insert(
                entry.name,
                SectionPattern {
                    substrings: entry.substrings,
                    expected_level: entry.expected_level,
                },
            );
        }
        Ok(Self::from_patterns(sections)?)
    }

    /// 校验所有条目
    pub fn validate(&self) -> Result<(), SectionError> {
        if self.sections.is_empty() {
            return Err(SectionError::InvalidPattern {
                section: String::new(),
                reason: "注册表为空".to_string(),
            });
        }
        for (name, pattern) in &self.sections {
            let invalid = |reason: &str| SectionError::InvalidPattern {
                section: name.clone(),
                reason: reason.to_string(),
            };
            if name.trim().is_empty() {
                return Err(invalid("章节名不能为空"));
            }
            if pattern.substrings.is_empty() {
                return Err(invalid("至少需要一个标题子串"));
            }
            if pattern.substrings.iter().any(|s| s.trim().is_empty()) {
                return Err(invalid("标题子串不能为空白"));
            }
            if let Some(level) = pattern.expected_level {
                if !(1..=6).contains(&level) {
                    return Err(invalid("标题级别必须在 1..=6 范围内"));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SectionPattern> {
        self.sections.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionPattern)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// 找出不在注册表中的章节名（保持请求顺序）
    pub fn unknown_names<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        requested
            .iter()
            .filter(|name| !self.contains(name))
            .map(String::as_str)
            .collect()
    }
}

impl Default for SectionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
