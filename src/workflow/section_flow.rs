//! 章节处理流程 - 流程层
//!
//! 核心职责：定义"一个章节"的完整处理流程
//!
//! 流程顺序：
//! 1. 在文档快照中定位章节（找不到则跳过，不影响其他章节）
//! 2. 构建 prompt → 调用生成服务 → 恢复节点
//! 3. 生成失败按重试策略退避重试
//! 4. 重试耗尽 / 不可重试 / 输出无法恢复 → 降级为原始内容

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::clients::GenerationClient;
use crate::error::{GenerationError, ParseFailure};
use crate::models::{BlockNode, NodeCensus, SectionRange};
use crate::services::reference_store::section_material;
use crate::services::{
    prompt_builder, recover, DocumentSnapshot, PlaceholderFiller, Recovered, RecoveryStage,
};
use crate::utils::logging::truncate_text;
use crate::workflow::edit_job::{EditJob, JobMode};
use crate::workflow::retry::RetryPolicy;

/// 章节失败原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureReason {
    /// 文档中没有该章节的标题
    NotFound,
    /// 可重试错误用尽了所有尝试次数
    GenerationExhausted { message: String },
    /// 不可重试的生成错误
    GenerationFatal { message: String },
    /// 模型输出无法恢复为合法节点
    ParseFailure { stages: Vec<String> },
    /// 任务本身异常退出
    TaskAborted { message: String },
}

impl From<&ParseFailure> for FailureReason {
    fn from(failure: &ParseFailure) -> Self {
        FailureReason::ParseFailure {
            stages: failure
                .stages
                .iter()
                .map(|s| format!("{}: {}", s.stage, s.reason))
                .collect(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotFound => write!(f, "未找到章节"),
            FailureReason::GenerationExhausted { message } => write!(f, "重试耗尽: {}", message),
            FailureReason::GenerationFatal { message } => write!(f, "不可重试: {}", message),
            FailureReason::ParseFailure { stages } => write!(f, "输出无法恢复 ({} 个阶段失败)", stages.len()),
            FailureReason::TaskAborted { message } => write!(f, "任务异常: {}", message),
        }
    }
}

/// 单个章节的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOutcome {
    pub section_name: String,
    pub success: bool,
    /// 成功时为生成的节点，降级时为原始节点，未找到时为 `None`
    #[serde(skip)]
    pub nodes: Option<Vec<BlockNode>>,
    #[serde(skip)]
    pub range: Option<SectionRange>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_stage: Option<RecoveryStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

impl SectionOutcome {
    pub fn not_found(section_name: String) -> Self {
        Self {
            section_name,
            success: false,
            nodes: None,
            range: None,
            attempts: 0,
            recovery_stage: None,
            failure: Some(FailureReason::NotFound),
        }
    }

    pub fn aborted(section_name: String, message: impl Into<String>) -> Self {
        Self {
            section_name,
            success: false,
            nodes: None,
            range: None,
            attempts: 0,
            recovery_stage: None,
            failure: Some(FailureReason::TaskAborted {
                message: message.into(),
            }),
        }
    }

    fn succeeded(job: EditJob, nodes: Vec<BlockNode>, attempts: u32, stage: RecoveryStage) -> Self {
        Self {
            section_name: job.section_name,
            success: true,
            nodes: Some(nodes),
            range: Some(job.range),
            attempts,
            recovery_stage: Some(stage),
            failure: None,
        }
    }

    fn degraded(job: EditJob, attempts: u32, failure: FailureReason) -> Self {
        Self {
            section_name: job.section_name,
            success: false,
            nodes: Some(job.original),
            range: Some(job.range),
            attempts,
            recovery_stage: None,
            failure: Some(failure),
        }
    }
}

/// 章节处理流程
///
/// - 编排单个章节的完整处理流程
/// - 决定何时重试、何时降级
/// - 只读访问文档快照，不修改文档
pub struct SectionFlow {
    client: Arc<dyn GenerationClient>,
    retry: RetryPolicy,
    placeholder: PlaceholderFiller,
}

impl SectionFlow {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        retry: RetryPolicy,
        placeholder: PlaceholderFiller,
    ) -> Self {
        Self {
            client,
            retry,
            placeholder,
        }
    }

    pub async fn run(
        &self,
        snapshot: &DocumentSnapshot,
        section_name: String,
        index: usize,
        mode: &JobMode,
    ) -> SectionOutcome {
        let range = match snapshot.locate(&section_name) {
            Ok(range) => range,
            Err(e) => {
                warn!("[章节 {}] ⚠️ {}，跳过", section_name, e);
                return SectionOutcome::not_found(section_name);
            }
        };

        let original = snapshot.document().content[range.start..range.end].to_vec();
        let job = EditJob::new(section_name, index, range, original);
        info!("{} 🚀 开始{}，原有 {} 个节点", job, mode.label(), job.original.len());

        let prompt = self.build_prompt(&job, mode);
        debug!("{} prompt 长度: {} 字符", job, prompt.len());

        self.generate_with_retry(job, &prompt, mode).await
    }

    fn build_prompt(&self, job: &EditJob, mode: &JobMode) -> String {
        match mode {
            JobMode::Edit { instructions } => {
                prompt_builder::edit_prompt(&job.section_name, &job.original, instructions)
            }
            JobMode::Fill { subject, reference } => {
                let material = reference
                    .as_deref()
                    .and_then(|payload| section_material(payload, &job.section_name));
                if material.is_some() {
                    debug!("{} 使用参考资料", job);
                }
                prompt_builder::fill_prompt(
                    &job.section_name,
                    &job.original,
                    subject,
                    self.placeholder.name(),
                    material.as_deref(),
                )
            }
        }
    }

    async fn generate_with_retry(
        &self,
        job: EditJob,
        prompt: &str,
        mode: &JobMode,
    ) -> SectionOutcome {
        let mut attempt: u32 = 0;
        loop {
            let attempts = attempt + 1;
            let err = match self.client.generate(prompt).await {
                Ok(raw) => return self.finish(job, &raw, attempts, mode),
                Err(err) => err,
            };

            warn!(
                "{} ✗ 第 {}/{} 次生成失败: {}",
                job, attempts, self.retry.max_attempts, err
            );
            match self.retry.backoff_delay(attempt, &err) {
                Some(delay) => {
                    info!("{} ⏳ {} ms 后重试", job, delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
                None => {
                    let failure = match err {
                        GenerationError::Fatal { message } => {
                            FailureReason::GenerationFatal { message }
                        }
                        other => FailureReason::GenerationExhausted {
                            message: other.to_string(),
                        },
                    };
                    error!("{} ❌ 保留原内容: {}", job, failure);
                    return SectionOutcome::degraded(job, attempts, failure);
                }
            }
            attempt += 1;
        }
    }

    /// 恢复输出并完成后处理；输出无法恢复时直接降级，不再重试
    fn finish(&self, job: EditJob, raw: &str, attempts: u32, mode: &JobMode) -> SectionOutcome {
        match recover(raw) {
            Ok(Recovered { mut nodes, stage }) => {
                if let JobMode::Fill { subject, .. } = mode {
                    let replaced = self.placeholder.fill(&mut nodes, subject);
                    if replaced > 0 {
                        debug!("{} 替换了 {} 处占位符", job, replaced);
                    }
                }
                check_structure(&job, &nodes);
                info!(
                    "{} ✓ 完成 (第 {} 次尝试, 恢复阶段: {}, {} 个节点)",
                    job,
                    attempts,
                    stage,
                    nodes.len()
                );
                SectionOutcome::succeeded(job, nodes, attempts, stage)
            }
            Err(failure) => {
                error!(
                    "{} ❌ {}，保留原内容。原始输出: {}",
                    job,
                    failure,
                    truncate_text(&failure.raw, 200)
                );
                let reason = FailureReason::from(&failure);
                SectionOutcome::degraded(job, attempts, reason)
            }
        }
    }
}

/// 表格数量减少时给出警告，不阻止拼接
fn check_structure(job: &EditJob, nodes: &[BlockNode]) {
    let before = NodeCensus::of(&job.original);
    let after = NodeCensus::of(nodes);
    if after.tables < before.tables {
        warn!(
            "{} ⚠️ 表格数量减少: {} → {} (原结构 {:?}, 新结构 {:?})",
            job, before.tables, after.tables, before, after
        );
    }
}
