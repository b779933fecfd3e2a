//! 章节任务上下文
//!
//! 封装"我正在处理哪个章节、原来的内容是什么"这一信息

use std::fmt::Display;
use std::sync::Arc;

use serde_json::Value;

use crate::models::{BlockNode, SectionRange};

/// 生成模式
#[derive(Debug, Clone)]
pub enum JobMode {
    /// 按说明编辑已有内容
    Edit { instructions: String },
    /// 为某个主体填充模板章节
    Fill {
        subject: String,
        /// 该主体的参考资料（整份）
        reference: Option<Arc<Value>>,
    },
}

impl JobMode {
    pub fn label(&self) -> &'static str {
        match self {
            JobMode::Edit { .. } => "编辑",
            JobMode::Fill { .. } => "填充",
        }
    }
}

/// 单个章节的任务
///
/// 包含生成与降级所需的全部上下文
#[derive(Debug, Clone)]
pub struct EditJob {
    /// 章节名
    pub section_name: String,

    /// 请求中的序号（仅用于日志显示）
    pub index: usize,

    /// 定位到的范围
    pub range: SectionRange,

    /// 编辑前的原始节点，失败时原样返回
    pub original: Vec<BlockNode>,
}

impl EditJob {
    pub fn new(
        section_name: String,
        index: usize,
        range: SectionRange,
        original: Vec<BlockNode>,
    ) -> Self {
        Self {
            section_name,
            index,
            range,
            original,
        }
    }
}

impl Display for EditJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[章节 {} #{} 范围 {}..{}]",
            self.section_name, self.index, self.range.start, self.range.end
        )
    }
}
