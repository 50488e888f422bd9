//! 标识符类型
//!
//! 用 newtype 区分不同实体的 ID，避免互相混用

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// 测试 ID
    TestId(u64)
);
id_type!(
    /// 题目 ID（本系统内部分配，不同于表单服务的 questionId）
    QuestionId(u64)
);
id_type!(
    /// 用户 ID（聊天平台的用户标识）
    UserId(i64)
);
id_type!(
    /// 聊天消息 ID
    MessageId(i32)
);

/// 选项序号，从1开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OptionIndex(NonZeroU32);

impl OptionIndex {
    /// 从1开始的序号创建，0 返回 None
    pub fn new(one_based: u32) -> Option<Self> {
        NonZeroU32::new(one_based).map(Self)
    }

    /// 从0开始的位置创建
    pub fn from_position(position: usize) -> Option<Self> {
        u32::try_from(position + 1).ok().and_then(Self::new)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// 对应 `options` 中的位置（从0开始）
    pub fn position(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for OptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
