//! 章节边界缓存 - 业务能力层
//!
//! 针对某个已知模板实例预先计算好的 `{start, end}` 表。
//! 只有在模板指纹一致、范围在界内、且起点确实是该章节标题时才采用，
//! 否则一律回退到 `section_locator` 动态扫描。

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SectionError;
use crate::models::{Document, SectionRange, SectionRegistry, TemplateFingerprint};
use crate::services::section_locator;

/// 预计算的章节边界表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryCache {
    pub fingerprint: TemplateFingerprint,
    pub entries: BTreeMap<String, SectionRange>,
}

impl BoundaryCache {
    /// 对模板扫描注册表中的每个章节
    pub fn build(template: &Document, registry: &SectionRegistry) -> Self {
        let mut entries = BTreeMap::new();
        for (name, pattern) in registry.iter() {
            match section_locator::locate_pattern(&template.content, pattern) {
                Some(range) => {
                    debug!("[边界缓存] {}: [{}, {})", name, range.start, range.end);
                    entries.insert(name.to_string(), range);
                }
                None => warn!("[边界缓存] 模板中未找到章节: {}", name),
            }
        }
        info!(
            "✓ 边界缓存构建完成: {}/{} 个章节",
            entries.len(),
            registry.len()
        );
        Self {
            fingerprint: template.fingerprint(),
            entries,
        }
    }

    /// 指纹是否与文档一致
    pub fn matches(&self, document: &Document) -> bool {
        // 先比较节点数，避免对明显不同的文档计算哈希
        self.fingerprint.node_count == document.len() && self.fingerprint == document.fingerprint()
    }

    /// 查询并校验缓存条目
    ///
    /// 调用方需先确认 `matches`；这里只做条目级别的校验
    pub fn verified_entry(
        &self,
        document: &Document,
        section_name: &str,
        registry: &SectionRegistry,
    ) -> Option<SectionRange> {
        let range = *self.entries.get(section_name)?;
        let pattern = registry.get(section_name)?;
        let in_bounds = range.end > range.start && range.end <= document.len();
        if in_bounds
            && section_locator::is_section_heading(&document.content, range.start, pattern)
        {
            Some(range)
        } else {
            debug!("[边界缓存] 条目校验失败: {}", section_name);
            None
        }
    }
}

/// 两级章节解析：可信缓存 → 动态定位
#[derive(Debug, Clone)]
pub struct SectionResolver {
    registry: Arc<SectionRegistry>,
    cache: Option<Arc<BoundaryCache>>,
}

impl SectionResolver {
    pub fn new(registry: Arc<SectionRegistry>) -> Self {
        Self {
            registry,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: BoundaryCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn registry(&self) -> &Arc<SectionRegistry> {
        &self.registry
    }

    /// 为一次请求捕获不可变快照
    ///
    /// 指纹只在这里比较一次，之后所有并发任务共享结果
    pub fn snapshot(&self, document: Document) -> DocumentSnapshot {
        let trusted_cache = match &self.cache {
            Some(cache) if cache.matches(&document) => {
                debug!("[边界缓存] 模板指纹一致，启用缓存");
                Some(cache.clone())
            }
            Some(_) => {
                debug!("[边界缓存] 模板指纹不一致，使用动态定位");
                None
            }
            None => None,
        };
        DocumentSnapshot {
            document: Arc::new(document),
            registry: self.registry.clone(),
            trusted_cache,
        }
    }
}

/// 请求开始时捕获的只读文档快照
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    document: Arc<Document>,
    registry: Arc<SectionRegistry>,
    trusted_cache: Option<Arc<BoundaryCache>>,
}

impl DocumentSnapshot {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn uses_cache(&self) -> bool {
        self.trusted_cache.is_some()
    }

    /// 解析章节范围
    pub fn locate(&self, section_name: &str) -> Result<SectionRange, SectionError> {
        if let Some(range) = self
            .trusted_cache
            .as_ref()
            .and_then(|cache| cache.verified_entry(&self.document, section_name, &self.registry))
        {
            debug!("[章节 {}] 命中边界缓存 [{}, {})", section_name, range.start, range.end);
            return Ok(range);
        }
        section_locator::locate(&self.document.content, section_name, &self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockNode, SectionPattern};

    fn registry() -> Arc<SectionRegistry> {
        Arc::new(
            SectionRegistry::from_patterns([
                (
                    "Alpha".to_string(),
                    SectionPattern {
                        substrings: vec!["Alpha".to_string()],
                        expected_level: None,
                    },
                ),
                (
                    "Beta".to_string(),
                    SectionPattern {
                        substrings: vec!["Beta".to_string()],
                        expected_level: None,
                    },
                ),
            ])
            .unwrap(),
        )
    }

    fn template() -> Document {
        Document::new(vec![
            BlockNode::heading(1, "Alpha"),
            BlockNode::paragraph("a1"),
            BlockNode::heading(1, "Beta"),
            BlockNode::paragraph("b1"),
            BlockNode::paragraph("b2"),
        ])
    }

    #[test]
    fn test_build_records_every_found_section() {
        let cache = BoundaryCache::build(&template(), &registry());
        assert_eq!(cache.entries["Alpha"], SectionRange { start: 0, end: 2 });
        assert_eq!(cache.entries["Beta"], SectionRange { start: 2, end: 5 });
        assert_eq!(cache.fingerprint.node_count, 5);
    }

    #[test]
    fn test_cache_json_roundtrip() {
        let cache = BoundaryCache::build(&template(), &registry());
        let json = serde_json::to_string(&cache).unwrap();
        let back: BoundaryCache = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cache);
    }

    #[test]
    fn test_snapshot_trusts_cache_only_on_matching_fingerprint() {
        let registry = registry();
        let cache = BoundaryCache::build(&template(), &registry);
        let resolver = SectionResolver::new(registry).with_cache(cache);

        assert!(resolver.snapshot(template()).uses_cache());

        let mut changed = template();
        changed.content.push(BlockNode::paragraph("extra"));
        assert!(!resolver.snapshot(changed).uses_cache());
    }

    #[test]
    fn test_stale_cache_falls_back_to_locator() {
        let registry = registry();
        let mut cache = BoundaryCache::build(&template(), &registry);
        // 人为篡改条目，但保留指纹
        cache
            .entries
            .insert("Beta".to_string(), SectionRange { start: 3, end: 5 });
        let resolver = SectionResolver::new(registry).with_cache(cache);

        let snapshot = resolver.snapshot(template());
        assert!(snapshot.uses_cache());
        // 起点不是 Beta 标题，条目被拒绝，改用动态定位
        assert_eq!(
            snapshot.locate("Beta").unwrap(),
            SectionRange { start: 2, end: 5 }
        );
    }

    #[test]
    fn test_trusted_cache_entry_is_used() {
        let registry = registry();
        let mut cache = BoundaryCache::build(&template(), &registry);
        // 起点仍是 Beta 标题，缩短的结束位置会被采用
        cache
            .entries
            .insert("Beta".to_string(), SectionRange { start: 2, end: 4 });
        let resolver = SectionResolver::new(registry).with_cache(cache);

        let snapshot = resolver.snapshot(template());
        assert_eq!(
            snapshot.locate("Beta").unwrap(),
            SectionRange { start: 2, end: 4 }
        );
    }

    #[test]
    fn test_snapshot_without_cache_locates_dynamically() {
        let resolver = SectionResolver::new(registry());
        let snapshot = resolver.snapshot(template());
        assert!(!snapshot.uses_cache());
        assert_eq!(
            snapshot.locate("Alpha").unwrap(),
            SectionRange { start: 0, end: 2 }
        );
    }
}
