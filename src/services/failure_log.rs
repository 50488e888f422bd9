//! 提交失败记录 - 业务能力层
//!
//! 只负责"追加写入失败记录"能力，不关心流程

use anyhow::{Context, Result};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::ids::{TestId, UserId};

/// 提交失败记录
pub struct FailureLog {
    path: String,
}

impl FailureLog {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 追加一条失败记录
    ///
    /// # 参数
    /// - `user_id`: 提交的用户
    /// - `test_id`: 提交的测试
    /// - `reason`: 失败原因
    pub async fn record(&self, user_id: UserId, test_id: TestId, reason: &str) -> Result<()> {
        debug!("写入提交失败记录: 用户 {} | 测试 {}", user_id, test_id);

        let line = format!(
            "[{}] 用户 {} | 测试 {} | 原因: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            user_id,
            test_id,
            reason.replace('\n', " ")
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("无法打开失败记录文件: {}", self.path))?;

        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("无法写入失败记录文件: {}", self.path))?;
        file.flush()
            .await
            .with_context(|| format!("无法写入失败记录文件: {}", self.path))?;

        Ok(())
    }
}
