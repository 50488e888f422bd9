//! 导航状态存储 - 业务能力层
//!
//! 每个用户一条记录，写入时按版本号比较交换

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::models::ids::UserId;
use crate::models::navigation::NavigationState;

pub trait NavigationStore: Send + Sync {
    /// 读取用户状态，没有记录时返回版本为0的 Idle 状态
    fn load(&self, user_id: UserId) -> Result<NavigationState, StoreError>;

    /// 仅当已保存的版本等于 `expected_version` 时写入
    fn save(&self, state: &NavigationState, expected_version: u64) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryNavigationStore {
    states: Mutex<HashMap<UserId, NavigationState>>,
}

impl InMemoryNavigationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NavigationStore for InMemoryNavigationStore {
    fn load(&self, user_id: UserId) -> Result<NavigationState, StoreError> {
        let states = self.states.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(states
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| NavigationState::idle(user_id)))
    }

    fn save(&self, state: &NavigationState, expected_version: u64) -> Result<(), StoreError> {
        let mut states = self.states.lock().map_err(|_| StoreError::Poisoned)?;
        let found = states.get(&state.user_id).map_or(0, |s| s.version);
        if found != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found,
            });
        }
        states.insert(state.user_id, state.clone());
        Ok(())
    }
}
