//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 加载注册表、边界缓存、参考资料
//! - 读写请求 / 结果文件，输出全局统计信息
//!
//! ### `section_editor` - 章节编辑器
//! - 请求预检（文档、章节名、说明）
//! - 捕获文档快照，调度所有章节任务
//! - 按降序索引拼接成功的章节
//!
//! ### `batch_scheduler` - 批量调度器
//! - 分批 + Semaphore 控制并发
//! - 批次间隔，结果保持提交顺序
//!
//! ## 层次关系
//!
//! ```text
//! app (处理请求文件)
//!     ↓
//! section_editor (处理 Vec<章节名>)
//!     ↓
//! batch_scheduler (并发执行)
//!     ↓
//! workflow::SectionFlow (处理单个章节)
//!     ↓
//! services (能力层：locate / recover / patch)
//!     ↓
//! clients (生成服务)
//! ```

pub mod app;
pub mod batch_scheduler;
pub mod section_editor;

// 重新导出主要类型
pub use app::App;
pub use batch_scheduler::BatchScheduler;
pub use section_editor::{EditRequest, EditResponse, FillRequest, JobRequest, SectionEditor};
