//! # Section Patcher
//!
//! 分章节的文档补丁引擎：按标题定位文档中的章节，
//! 并发调用外部生成服务改写各章节，恢复模型输出中的节点，
//! 再把结果拼回文档，不触碰未改写的区域。
//!
//! ## 架构设计
//!
//! ### ① 模型层（Models）
//! - `models/` - Block Node 树、文档、章节注册表、文件加载
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个章节
//! - `section_locator` / `boundary_cache` - 章节定位
//! - `recovery` / `json_repair` - 模型输出恢复
//! - `patch_applier` - 降序拼接
//! - `prompt_builder` / `placeholder` / `reference_store` - 生成辅助
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个章节"的完整处理流程
//! - `EditJob` - 上下文封装（章节名 + 范围 + 原始节点）
//! - `SectionFlow` - 流程编排（locate → generate → recover → retry / degrade）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_scheduler` - 分批并发调度
//! - `orchestrator/section_editor` - 请求入口
//! - `orchestrator/app` - 文件驱动的应用生命周期
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{GenerationClient, LlmClient};
pub use config::Config;
pub use error::{AppError, AppResult, GenerationError, ParseFailure, SectionError};
pub use models::{BlockNode, Document, SectionRange, SectionRegistry};
pub use orchestrator::{
    App, BatchScheduler, EditRequest, EditResponse, FillRequest, JobRequest, SectionEditor,
};
pub use services::{recover, BoundaryCache, SectionResolver};
pub use workflow::{FailureReason, RetryPolicy, SectionFlow, SectionOutcome};
