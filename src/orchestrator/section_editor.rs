//! 章节编辑入口 - 编排层
//!
//! 请求 → 预检 → 文档快照 → 批量调度各章节任务 → 按降序索引拼接结果。
//! 预检失败时整个请求失败，且不会发出任何生成调用；
//! 单个章节的失败只体现在结果列表中，文档对应区域保持原样。

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clients::GenerationClient;
use crate::config::Config;
use crate::error::{AppError, AppResult, RequestError, SectionError};
use crate::models::Document;
use crate::services::patch_applier::{self, Replacement};
use crate::services::{PlaceholderFiller, ReferenceStore, SectionResolver};
use crate::workflow::{JobMode, RetryPolicy, SectionFlow, SectionOutcome};

use super::batch_scheduler::BatchScheduler;

/// 编辑请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub document: Document,
    pub sections: Vec<String>,
    pub edit_instructions: String,
}

/// 填充请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    pub document: Document,
    pub sections: Vec<String>,
    pub subject: String,
}

/// 文件驱动时使用的请求格式，以 `"mode"` 区分
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum JobRequest {
    Edit(EditRequest),
    Fill(FillRequest),
}

impl JobRequest {
    pub fn label(&self) -> &'static str {
        match self {
            JobRequest::Edit(_) => "编辑",
            JobRequest::Fill(_) => "填充",
        }
    }

    pub fn sections(&self) -> &[String] {
        match self {
            JobRequest::Edit(r) => &r.sections,
            JobRequest::Fill(r) => &r.sections,
        }
    }

    pub fn document(&self) -> &Document {
        match self {
            JobRequest::Edit(r) => &r.document,
            JobRequest::Fill(r) => &r.document,
        }
    }
}

/// 编辑结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    pub document: Document,
    pub title: String,
    pub successful_sections: Vec<String>,
    pub failed_sections: Vec<String>,
    pub outcomes: Vec<SectionOutcome>,
}

/// 章节编辑器
pub struct SectionEditor {
    resolver: SectionResolver,
    flow: Arc<SectionFlow>,
    scheduler: BatchScheduler,
    references: Option<Arc<dyn ReferenceStore>>,
}

impl SectionEditor {
    pub fn new(resolver: SectionResolver, flow: SectionFlow, scheduler: BatchScheduler) -> Self {
        Self {
            resolver,
            flow: Arc::new(flow),
            scheduler,
            references: None,
        }
    }

    /// 按配置组装
    pub fn from_config(
        config: &Config,
        client: Arc<dyn GenerationClient>,
        resolver: SectionResolver,
    ) -> AppResult<Self> {
        config.validate()?;
        let placeholder = PlaceholderFiller::new(&config.placeholder_name)
            .map_err(|e| AppError::invalid_config("placeholder_name", e.to_string()))?;
        let flow = SectionFlow::new(client, RetryPolicy::from_config(config), placeholder);
        Ok(Self::new(resolver, flow, BatchScheduler::from_config(config)))
    }

    pub fn with_reference_store(mut self, store: Arc<dyn ReferenceStore>) -> Self {
        self.references = Some(store);
        self
    }

    /// 统一入口
    pub async fn handle(&self, request: JobRequest) -> AppResult<EditResponse> {
        match request {
            JobRequest::Edit(request) => self.edit(request).await,
            JobRequest::Fill(request) => self.fill(request).await,
        }
    }

    /// 按说明编辑若干章节
    pub async fn edit(&self, request: EditRequest) -> AppResult<EditResponse> {
        if request.edit_instructions.trim().is_empty() {
            return Err(RequestError::EmptyInstructions.into());
        }
        let sections = self.preflight(&request.document, request.sections)?;
        let mode = JobMode::Edit {
            instructions: request.edit_instructions,
        };
        Ok(self.run_jobs(request.document, sections, mode).await)
    }

    /// 为某个主体填充若干章节
    pub async fn fill(&self, request: FillRequest) -> AppResult<EditResponse> {
        let subject = request.subject.trim().to_string();
        if subject.is_empty() {
            return Err(RequestError::EmptySubject.into());
        }
        let sections = self.preflight(&request.document, request.sections)?;

        let reference = match &self.references {
            Some(store) => store.fetch(&subject).await.map(Arc::new),
            None => None,
        };
        if reference.is_none() {
            info!("[参考资料] {} 没有参考资料，仅依赖模型知识", subject);
        }

        let mode = JobMode::Fill { subject, reference };
        Ok(self.run_jobs(request.document, sections, mode).await)
    }

    /// 请求预检：任何一项不通过都不会发出生成调用
    fn preflight(&self, document: &Document, sections: Vec<String>) -> AppResult<Vec<String>> {
        if document.is_empty() {
            return Err(RequestError::EmptyDocument.into());
        }
        if sections.is_empty() {
            return Err(RequestError::NoSections.into());
        }

        let unknown = self.resolver.registry().unknown_names(&sections);
        if !unknown.is_empty() {
            return Err(SectionError::InvalidSectionNames(
                unknown.into_iter().map(str::to_string).collect(),
            )
            .into());
        }

        // 同一章节只处理一次，否则两个替换会作用在同一范围上
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(sections.len());
        for name in sections {
            if seen.insert(name.clone()) {
                unique.push(name);
            } else {
                warn!("[章节 {}] ⚠️ 重复请求，已忽略", name);
            }
        }
        Ok(unique)
    }

    async fn run_jobs(
        &self,
        document: Document,
        sections: Vec<String>,
        mode: JobMode,
    ) -> EditResponse {
        let snapshot = self.resolver.snapshot(document);
        info!(
            "📋 {} {} 个章节 (文档 {} 个节点, 边界缓存: {})",
            mode.label(),
            sections.len(),
            snapshot.document().len(),
            if snapshot.uses_cache() { "启用" } else { "未启用" }
        );

        let mode = Arc::new(mode);
        let flow = self.flow.clone();
        let job_snapshot = snapshot.clone();
        let outcomes = self
            .scheduler
            .process(sections, move |index, section_name| {
                let flow = flow.clone();
                let snapshot = job_snapshot.clone();
                let mode = mode.clone();
                async move { flow.run(&snapshot, section_name, index, &mode).await }
            })
            .await;

        let replacements: Vec<Replacement> = outcomes
            .iter()
            .filter(|outcome| outcome.success)
            .filter_map(|outcome| Some(Replacement::new(outcome.range?, outcome.nodes.clone()?)))
            .collect();
        let document = patch_applier::apply(snapshot.document(), replacements);

        let (successful, failed): (Vec<&SectionOutcome>, Vec<&SectionOutcome>) =
            outcomes.iter().partition(|outcome| outcome.success);
        EditResponse {
            title: document.title_or_default(),
            document,
            successful_sections: successful.iter().map(|o| o.section_name.clone()).collect(),
            failed_sections: failed.iter().map(|o| o.section_name.clone()).collect(),
            outcomes,
        }
    }
}
