use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::ids::{MessageId, QuestionId, TestId, UserId};

/// 用户当前所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NavPhase {
    /// 没有进行中的测试
    #[default]
    Idle,
    /// 已选择测试，尚未展示题目
    TestSelected { test_id: TestId },
    /// 正在展示某道题
    QuestionShown {
        test_id: TestId,
        question_id: QuestionId,
    },
    /// 已结束作答，正在提交
    Completed { test_id: TestId },
}

impl NavPhase {
    pub fn name(&self) -> &'static str {
        match self {
            NavPhase::Idle => "Idle",
            NavPhase::TestSelected { .. } => "TestSelected",
            NavPhase::QuestionShown { .. } => "QuestionShown",
            NavPhase::Completed { .. } => "Completed",
        }
    }
}

/// 用户导航状态（每个用户一条）
///
/// 只能通过 `workflow::navigation::transition` 生成新状态，每次转换 `version` 加一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub user_id: UserId,
    pub phase: NavPhase,
    pub version: u64,
    /// 待清理的临时消息
    pub ephemeral_message_ids: BTreeSet<MessageId>,
}

impl NavigationState {
    pub fn idle(user_id: UserId) -> Self {
        Self {
            user_id,
            phase: NavPhase::Idle,
            version: 0,
            ephemeral_message_ids: BTreeSet::new(),
        }
    }

    pub fn current_test_id(&self) -> Option<TestId> {
        match self.phase {
            NavPhase::Idle => None,
            NavPhase::TestSelected { test_id }
            | NavPhase::QuestionShown { test_id, .. }
            | NavPhase::Completed { test_id } => Some(test_id),
        }
    }

    pub fn current_question_id(&self) -> Option<QuestionId> {
        match self.phase {
            NavPhase::QuestionShown { question_id, .. } => Some(question_id),
            _ => None,
        }
    }
}
