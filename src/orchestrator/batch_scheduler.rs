//! 批量章节调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **分批处理**：按 `batch_size` 把章节分批，每批完成后再开始下一批
//! 2. **并发控制**：使用 Semaphore 限制同时进行的生成任务
//! 3. **批次间隔**：两批之间暂停固定时间，降低触发频率限制的概率
//! 4. **顺序保证**：结果与提交顺序一一对应
//! 5. **故障隔离**：单个任务异常只产生一个失败结果，不影响其他章节

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::config::Config;
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::SectionOutcome;

/// 批量调度器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchScheduler {
    batch_size: usize,
    pause: Duration,
}

impl BatchScheduler {
    pub fn new(batch_size: usize, pause: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            pause,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.batch_size, config.batch_pause())
    }

    /// 为每个章节运行一个任务
    ///
    /// `run` 接收 (提交序号, 章节名)，返回的 future 在独立任务中执行
    pub async fn process<F, Fut>(&self, section_names: Vec<String>, run: F) -> Vec<SectionOutcome>
    where
        F: Fn(usize, String) -> Fut,
        Fut: Future<Output = SectionOutcome> + Send + 'static,
    {
        let total = section_names.len();
        let total_batches = total.div_ceil(self.batch_size);
        let semaphore = Arc::new(Semaphore::new(self.batch_size));
        let mut outcomes = Vec::with_capacity(total);

        for (batch_idx, batch) in section_names.chunks(self.batch_size).enumerate() {
            let batch_start = batch_idx * self.batch_size;
            let batch_num = batch_idx + 1;

            if batch_idx > 0 && !self.pause.is_zero() {
                debug!("⏸️ 批次间隔 {} ms", self.pause.as_millis());
                tokio::time::sleep(self.pause).await;
            }

            log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            // 为本批创建并发任务
            let mut batch_handles = Vec::with_capacity(batch.len());
            for (offset, section_name) in batch.iter().enumerate() {
                let task = run(batch_start + offset, section_name.clone());
                let handle = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => Some(tokio::spawn(async move {
                        let _permit = permit;
                        task.await
                    })),
                    Err(e) => {
                        error!("[章节 {}] 无法获取并发许可: {}", section_name, e);
                        None
                    }
                };
                batch_handles.push((section_name.clone(), handle));
            }

            // 等待本批所有任务完成（按提交顺序）
            let batch_outcomes = futures::future::join_all(batch_handles.into_iter().map(
                |(section_name, handle)| async move {
                    match handle {
                        Some(handle) => match handle.await {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                error!("[章节 {}] 任务执行失败: {}", section_name, e);
                                SectionOutcome::aborted(section_name, e.to_string())
                            }
                        },
                        None => SectionOutcome::aborted(section_name, "并发许可不可用"),
                    }
                },
            ))
            .await;

            let success = batch_outcomes.iter().filter(|o| o.success).count();
            log_batch_complete(batch_num, success, batch_outcomes.len());
            outcomes.extend(batch_outcomes);
        }

        outcomes
    }
}
