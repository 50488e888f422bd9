//! 事件调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **按用户串行**：同一用户的事件依次交给 `QuizFlow`，不会并发处理
//! 2. **跨用户并发**：不同用户的事件并发处理，使用 Semaphore 限制并发数量
//! 3. **批量处理**：一批事件按用户分组，每个用户一个任务，汇总统计

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tracing::{error, info};

use crate::error::{AppError, AppResult, StoreError};
use crate::models::ids::UserId;
use crate::workflow::{FlowOutcome, QuizEvent, QuizFlow};

/// 事件调度器
pub struct Dispatcher {
    flow: Arc<QuizFlow>,
    semaphore: Arc<Semaphore>,
    user_locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

/// 批量处理结果
#[derive(Debug, Default)]
pub struct BatchReport {
    pub success: usize,
    pub failed: usize,
    /// 每个用户的事件结果，顺序与提交顺序一致
    pub outcomes: BTreeMap<UserId, Vec<AppResult<FlowOutcome>>>,
}

impl Dispatcher {
    pub fn new(flow: Arc<QuizFlow>, max_concurrent_users: usize) -> Self {
        Self {
            flow,
            semaphore: Arc::new(Semaphore::new(max_concurrent_users.max(1))),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// 处理单个事件
    ///
    /// 先等待同一用户的上一个事件处理完，再占用并发名额；
    /// 排队中的事件不占名额，不会挤占其他用户
    pub async fn dispatch(&self, user_id: UserId, event: QuizEvent) -> AppResult<FlowOutcome> {
        let lock = self.user_lock(user_id)?;
        let result = self.dispatch_locked(&lock, user_id, event).await;
        self.release_user_lock(user_id, lock)?;
        result
    }

    async fn dispatch_locked(
        &self,
        lock: &AsyncMutex<()>,
        user_id: UserId,
        event: QuizEvent,
    ) -> AppResult<FlowOutcome> {
        let _guard = lock.lock().await;
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| AppError::DispatcherClosed)?;

        self.flow.handle(user_id, event).await
    }

    /// 批量处理事件
    ///
    /// 同一用户的事件保持原有顺序；不同用户并发
    pub async fn dispatch_batch(self: &Arc<Self>, events: Vec<(UserId, QuizEvent)>) -> BatchReport {
        let mut per_user: BTreeMap<UserId, Vec<QuizEvent>> = BTreeMap::new();
        for (user_id, event) in events {
            per_user.entry(user_id).or_default().push(event);
        }

        info!(
            "📦 开始处理一批事件: {} 个用户",
            per_user.len()
        );

        let handles: Vec<_> = per_user
            .into_iter()
            .map(|(user_id, events)| {
                let dispatcher = Arc::clone(self);
                let handle = tokio::spawn(async move {
                    let mut results = Vec::with_capacity(events.len());
                    for event in events {
                        results.push(dispatcher.dispatch(user_id, event).await);
                    }
                    results
                });
                (user_id, handle)
            })
            .collect();

        let mut report = BatchReport::default();
        let joined = futures::future::join_all(handles.into_iter().map(|(user_id, handle)| async move {
            (user_id, handle.await)
        }))
        .await;

        for (user_id, joined) in joined {
            match joined {
                Ok(results) => {
                    for result in &results {
                        match result {
                            Ok(_) => report.success += 1,
                            Err(e) => {
                                error!("[用户 #{}] ❌ 事件处理失败: {}", user_id, e);
                                report.failed += 1;
                            }
                        }
                    }
                    report.outcomes.insert(user_id, results);
                }
                Err(e) => {
                    error!("[用户 #{}] 任务执行失败: {}", user_id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "✓ 本批完成: 成功 {}/{}",
            report.success,
            report.success + report.failed
        );
        report
    }

    fn user_lock(&self, user_id: UserId) -> Result<Arc<AsyncMutex<()>>, StoreError> {
        let mut locks = self.user_locks.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(locks.entry(user_id).or_default().clone())
    }

    /// 没有其他事件持有或等待该用户的锁时，移除这把锁
    fn release_user_lock(&self, user_id: UserId, lock: Arc<AsyncMutex<()>>) -> Result<(), StoreError> {
        let mut locks = self.user_locks.lock().map_err(|_| StoreError::Poisoned)?;
        // 一份在表里，一份是这里的 `lock`
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&user_id);
        }
        Ok(())
    }
}
