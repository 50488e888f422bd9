//! 用户处理上下文
//!
//! 封装"我正在处理哪个用户的哪个测试"这一信息，只用于日志

use std::fmt::Display;

use crate::models::ids::{TestId, UserId};
use crate::models::navigation::NavigationState;

#[derive(Debug, Clone, Copy)]
pub struct UserCtx {
    pub user_id: UserId,
    pub test_id: Option<TestId>,
}

impl UserCtx {
    pub fn new(user_id: UserId, test_id: Option<TestId>) -> Self {
        Self { user_id, test_id }
    }

    pub fn from_state(state: &NavigationState) -> Self {
        Self::new(state.user_id, state.current_test_id())
    }
}

impl Display for UserCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.test_id {
            Some(test_id) => write!(f, "[用户 #{} 测试 #{}]", self.user_id, test_id),
            None => write!(f, "[用户 #{}]", self.user_id),
        }
    }
}
