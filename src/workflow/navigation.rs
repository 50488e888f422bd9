//! 导航状态转换
//!
//! 所有导航状态的变化都经过 `transition`：给定旧状态和一步操作，得到新状态。
//! 除 `Track` 外，每一步都会替换临时消息集合，调用方必须在此之前清理旧的临时消息。

use crate::error::NavigationError;
use crate::models::ids::{MessageId, QuestionId, TestId};
use crate::models::navigation::{NavPhase, NavigationState};

/// 一步导航操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavStep {
    /// 选择测试（任意状态均可）
    SelectTest {
        test_id: TestId,
        ephemeral: Vec<MessageId>,
    },
    /// 展示当前测试中的一道题
    ShowQuestion {
        question_id: QuestionId,
        ephemeral: Vec<MessageId>,
    },
    /// 记录新的临时消息，不改变阶段
    Track(Vec<MessageId>),
    /// 作答结束，进入提交
    Complete,
    /// 回到菜单（任意状态均可）
    Reset,
}

impl NavStep {
    pub fn name(&self) -> &'static str {
        match self {
            NavStep::SelectTest { .. } => "SelectTest",
            NavStep::ShowQuestion { .. } => "ShowQuestion",
            NavStep::Track(_) => "Track",
            NavStep::Complete => "Complete",
            NavStep::Reset => "Reset",
        }
    }
}

/// 计算下一个导航状态
///
/// 不接受的操作返回 `NavigationError::InvalidTransition`，旧状态保持不变
pub fn transition(state: &NavigationState, step: NavStep) -> Result<NavigationState, NavigationError> {
    let invalid = NavigationError::InvalidTransition {
        phase: state.phase.name(),
        step: step.name(),
    };

    let mut next = state.clone();
    next.version = state.version + 1;

    match step {
        NavStep::SelectTest { test_id, ephemeral } => {
            next.phase = NavPhase::TestSelected { test_id };
            next.ephemeral_message_ids = ephemeral.into_iter().collect();
        }
        NavStep::ShowQuestion {
            question_id,
            ephemeral,
        } => {
            let test_id = match state.phase {
                NavPhase::TestSelected { test_id } | NavPhase::QuestionShown { test_id, .. } => test_id,
                NavPhase::Idle | NavPhase::Completed { .. } => return Err(invalid),
            };
            next.phase = NavPhase::QuestionShown {
                test_id,
                question_id,
            };
            next.ephemeral_message_ids = ephemeral.into_iter().collect();
        }
        NavStep::Track(ids) => {
            next.ephemeral_message_ids.extend(ids);
        }
        NavStep::Complete => {
            let test_id = match state.phase {
                NavPhase::TestSelected { test_id } | NavPhase::QuestionShown { test_id, .. } => test_id,
                NavPhase::Idle | NavPhase::Completed { .. } => return Err(invalid),
            };
            next.phase = NavPhase::Completed { test_id };
            next.ephemeral_message_ids.clear();
        }
        NavStep::Reset => {
            next.phase = NavPhase::Idle;
            next.ephemeral_message_ids.clear();
        }
    }

    Ok(next)
}
