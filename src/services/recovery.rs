//! 响应恢复 - 业务能力层
//!
//! 把模型返回的原始文本转换为合法的节点序列。
//! 阶段按顺序尝试，第一个成功的阶段胜出：
//! 1. 去掉代码块围栏后严格解析
//! 2. 截取第一个 `[` 到最后一个 `]` 后严格解析
//! 3. 对截取结果做结构修复后再解析
//!
//! 全部失败时返回 `ParseFailure`，保留原始文本。

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{ParseFailure, StageFailure};
use crate::models::{validate_sequence, BlockNode};
use crate::services::json_repair::repair_json;

/// 恢复阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStage {
    Strict,
    ArraySpan,
    Repaired,
}

impl RecoveryStage {
    pub const ORDER: [RecoveryStage; 3] = [
        RecoveryStage::Strict,
        RecoveryStage::ArraySpan,
        RecoveryStage::Repaired,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RecoveryStage::Strict => "strict",
            RecoveryStage::ArraySpan => "array_span",
            RecoveryStage::Repaired => "repaired",
        }
    }

    /// 该阶段要解析的候选文本，按优先级排列；为空表示无法构造候选
    fn candidates(self, cleaned: &str) -> Vec<String> {
        match self {
            RecoveryStage::Strict => vec![cleaned.to_string()],
            RecoveryStage::ArraySpan => {
                array_span(cleaned).map(str::to_string).into_iter().collect()
            }
            RecoveryStage::Repaired => {
                // 截断的输出里最后一个 `]` 可能属于内层数组，先修复到结尾的整段
                let mut candidates = Vec::new();
                if let Some(start) = cleaned.find('[') {
                    candidates.push(repair_json(&cleaned[start..]));
                }
                if let Some(span) = array_span(cleaned) {
                    let repaired = repair_json(span);
                    if !candidates.contains(&repaired) {
                        candidates.push(repaired);
                    }
                }
                candidates
            }
        }
    }
}

impl fmt::Display for RecoveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 恢复成功的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub nodes: Vec<BlockNode>,
    pub stage: RecoveryStage,
}

/// 运行完整的恢复流程
pub fn recover(raw: &str) -> Result<Recovered, ParseFailure> {
    let cleaned = strip_code_fences(raw);
    let mut stages = Vec::with_capacity(RecoveryStage::ORDER.len());

    for stage in RecoveryStage::ORDER {
        let candidates = stage.candidates(&cleaned);
        if candidates.is_empty() {
            stages.push(StageFailure {
                stage: stage.name(),
                reason: "未找到 JSON 数组".to_string(),
            });
            continue;
        }

        let mut reasons = Vec::new();
        for candidate in candidates {
            match decode_nodes(&candidate) {
                Ok(nodes) => {
                    debug!("✓ 响应恢复成功 (阶段: {}, {} 个节点)", stage, nodes.len());
                    return Ok(Recovered { nodes, stage });
                }
                Err(reason) => reasons.push(reason),
            }
        }
        let reason = reasons.join("; ");
        debug!("[恢复] 阶段 {} 失败: {}", stage, reason);
        stages.push(StageFailure {
            stage: stage.name(),
            reason,
        });
    }

    Err(ParseFailure {
        raw: raw.to_string(),
        stages,
    })
}

/// 去掉 Markdown 代码块围栏及首尾空白
///
/// 只删除围栏本身（行首的围栏及语言标记、行尾的围栏），
/// 同一行上紧跟围栏的内容保留
pub fn strip_code_fences(raw: &str) -> String {
    let mut lines = Vec::new();
    for line in raw.trim().lines() {
        let mut rest = line;
        let mut fenced = false;
        if let Some(after) = rest.trim_start().strip_prefix("```") {
            let lang_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
                .unwrap_or(after.len());
            rest = &after[lang_len..];
            fenced = true;
        }
        if let Some(before) = rest.trim_end().strip_suffix("```") {
            rest = before;
            fenced = true;
        }
        // 只有围栏的行整行去掉
        if fenced && rest.trim().is_empty() {
            continue;
        }
        lines.push(rest);
    }
    lines.join("\n").trim().to_string()
}

/// 第一个 `[` 到最后一个 `]`（含）
pub fn array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// 严格解析并校验节点结构
fn decode_nodes(text: &str) -> Result<Vec<BlockNode>, String> {
    let nodes: Vec<BlockNode> =
        serde_json::from_str(text).map_err(|e| format!("JSON 解析失败: {}", e))?;
    if nodes.is_empty() {
        return Err("节点数组为空".to_string());
    }
    validate_sequence(&nodes).map_err(|e| format!("节点结构不合法: {}", e))?;
    Ok(nodes)
}
