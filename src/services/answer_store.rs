//! 答案存储 - 业务能力层
//!
//! 以 (题目, 用户) 为键保存答案，同一个键最多一条记录

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::StoreError;
use crate::models::answer::{Answer, AnswerPayload};
use crate::models::ids::{QuestionId, UserId};

/// 答案存储接口
///
/// `upsert` 在持锁期间完成读取、修改、写回，两次并发写入不会互相覆盖
pub trait AnswerStore: Send + Sync {
    /// 读取旧值（没有则为 `Empty`），用 `mutator` 计算新值并写回
    fn upsert(
        &self,
        question_id: QuestionId,
        user_id: UserId,
        mutator: &dyn Fn(&AnswerPayload) -> AnswerPayload,
    ) -> Result<Answer, StoreError>;

    fn get(&self, question_id: QuestionId, user_id: UserId) -> Result<Option<Answer>, StoreError>;

    /// 按 `question_ids` 的顺序返回该用户已有的答案
    fn answers_for(
        &self,
        user_id: UserId,
        question_ids: &[QuestionId],
    ) -> Result<Vec<Answer>, StoreError>;

    /// 删除该用户在这些题目上的答案，返回删除数量
    fn remove_for(&self, user_id: UserId, question_ids: &[QuestionId]) -> Result<usize, StoreError>;
}

/// 内存答案存储
#[derive(Default)]
pub struct InMemoryAnswerStore {
    answers: Mutex<HashMap<(QuestionId, UserId), Answer>>,
}

impl InMemoryAnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<(QuestionId, UserId), Answer>>, StoreError> {
        self.answers.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl AnswerStore for InMemoryAnswerStore {
    fn upsert(
        &self,
        question_id: QuestionId,
        user_id: UserId,
        mutator: &dyn Fn(&AnswerPayload) -> AnswerPayload,
    ) -> Result<Answer, StoreError> {
        let mut answers = self.lock()?;

        let answer = match answers.get(&(question_id, user_id)) {
            Some(existing) => Answer {
                payload: mutator(&existing.payload),
                revision: existing.revision + 1,
                ..existing.clone()
            },
            None => Answer {
                question_id,
                user_id,
                payload: mutator(&AnswerPayload::Empty),
                revision: 0,
            },
        };

        debug!(
            "保存答案: 用户 {} | 题目 {} | 版本 {} | {:?}",
            user_id,
            question_id,
            answer.revision,
            answer.payload.to_strings()
        );

        answers.insert((question_id, user_id), answer.clone());
        Ok(answer)
    }

    fn get(&self, question_id: QuestionId, user_id: UserId) -> Result<Option<Answer>, StoreError> {
        Ok(self.lock()?.get(&(question_id, user_id)).cloned())
    }

    fn answers_for(
        &self,
        user_id: UserId,
        question_ids: &[QuestionId],
    ) -> Result<Vec<Answer>, StoreError> {
        let answers = self.lock()?;
        Ok(question_ids
            .iter()
            .filter_map(|q| answers.get(&(*q, user_id)).cloned())
            .collect())
    }

    fn remove_for(&self, user_id: UserId, question_ids: &[QuestionId]) -> Result<usize, StoreError> {
        let mut answers = self.lock()?;
        Ok(question_ids
            .iter()
            .filter(|q| answers.remove(&(**q, user_id)).is_some())
            .count())
    }
}
