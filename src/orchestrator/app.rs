//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置、初始化日志文件、加载注册表 / 边界缓存 / 参考资料
//! 2. **请求处理**：读取请求文件，交给 `SectionEditor`
//! 3. **结果输出**：写出结果文件，输出并记录统计信息

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::{GenerationClient, LlmClient};
use crate::config::Config;
use crate::models::{load_json, load_registry, save_json, SectionRegistry};
use crate::orchestrator::section_editor::{EditResponse, JobRequest, SectionEditor};
use crate::services::{BoundaryCache, InMemoryReferenceStore, SectionResolver};
use crate::utils::logging::{
    append_log, init_log_file, log_request_loaded, log_startup, print_final_stats,
};

/// 应用主结构
pub struct App {
    config: Config,
    editor: SectionEditor,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置校验失败")?;

        // 初始化日志文件
        init_log_file(&config.output_log_file)?;
        log_startup(config.batch_size, config.max_attempts);

        if config.llm_api_key.is_empty() {
            warn!("⚠️ 未设置 LLM_API_KEY");
        }

        let resolver = Self::load_resolver(&config).await?;
        let client: Arc<dyn GenerationClient> = Arc::new(LlmClient::new(&config));
        let mut editor = SectionEditor::from_config(&config, client, resolver)?;

        if let Some(path) = &config.reference_store_file {
            let store = InMemoryReferenceStore::load(Path::new(path)).await?;
            info!("✓ 已加载参考资料: {} 个主体", store.len());
            editor = editor.with_reference_store(Arc::new(store));
        }

        Ok(Self { config, editor })
    }

    /// 注册表 + 可选的边界缓存
    async fn load_resolver(config: &Config) -> Result<SectionResolver> {
        let registry = match &config.registry_file {
            Some(path) => load_registry(Path::new(path)).await?,
            None => SectionRegistry::builtin(),
        };
        let mut resolver = SectionResolver::new(Arc::new(registry));

        if let Some(path) = &config.boundary_cache_file {
            let cache: BoundaryCache = load_json(Path::new(path)).await?;
            info!("✓ 已加载边界缓存: {} 个章节", cache.entries.len());
            resolver = resolver.with_cache(cache);
        }
        Ok(resolver)
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<EditResponse> {
        let request: JobRequest = load_json(Path::new(&self.config.request_file)).await?;
        log_request_loaded(
            request.label(),
            request.sections().len(),
            request.document().len(),
        );

        let response = self.editor.handle(request).await?;

        save_json(Path::new(&self.config.output_file), &response).await?;
        info!("✓ 结果已写入: {}", self.config.output_file);

        let success = response.successful_sections.len();
        let failed = response.failed_sections.len();
        print_final_stats(success, failed, success + failed, &self.config.output_log_file);
        append_log(&self.config.output_log_file, &run_summary(&response))?;

        Ok(response)
    }
}

/// 写入日志文件的运行摘要
fn run_summary(response: &EditResponse) -> String {
    let mut summary = format!(
        "完成时间: {}\n文档标题: {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        response.title
    );
    for outcome in &response.outcomes {
        let status = match &outcome.failure {
            None => "✅ 成功".to_string(),
            Some(reason) => format!("❌ {}", reason),
        };
        summary.push_str(&format!(
            "[章节 {}] {} (尝试 {} 次)\n",
            outcome.section_name, status, outcome.attempts
        ));
    }
    summary.push_str(&format!("{}\n", "=".repeat(60)));
    summary
}
