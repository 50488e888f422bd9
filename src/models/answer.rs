use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::ids::{OptionIndex, QuestionId, UserId};

/// 答案内容
///
/// 内部以类型化的值保存；字符串形式只在提交边界生成。
/// `Selected` 永远非空，清空后归一为 `Empty`。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnswerPayload {
    #[default]
    Empty,
    Text(String),
    Selected(BTreeSet<OptionIndex>),
}

impl AnswerPayload {
    pub fn single(index: OptionIndex) -> Self {
        AnswerPayload::Selected(BTreeSet::from([index]))
    }

    pub fn selected(indices: impl IntoIterator<Item = OptionIndex>) -> Self {
        let set: BTreeSet<OptionIndex> = indices.into_iter().collect();
        if set.is_empty() {
            AnswerPayload::Empty
        } else {
            AnswerPayload::Selected(set)
        }
    }

    /// 切换一个选项：不存在则加入，存在则移除
    pub fn toggled(&self, index: OptionIndex) -> Self {
        let mut set = match self {
            AnswerPayload::Selected(set) => set.clone(),
            AnswerPayload::Empty | AnswerPayload::Text(_) => BTreeSet::new(),
        };
        if !set.remove(&index) {
            set.insert(index);
        }
        Self::selected(set)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AnswerPayload::Empty)
    }

    pub fn is_selected(&self, index: OptionIndex) -> bool {
        match self {
            AnswerPayload::Selected(set) => set.contains(&index),
            _ => false,
        }
    }

    /// 已选选项（按序号升序）
    pub fn selected_indices(&self) -> Vec<OptionIndex> {
        match self {
            AnswerPayload::Selected(set) => set.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// 字符串列表形式：文本题一个元素，选择题为从1开始的序号
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            AnswerPayload::Empty => Vec::new(),
            AnswerPayload::Text(text) => vec![text.clone()],
            AnswerPayload::Selected(set) => set.iter().map(|i| i.to_string()).collect(),
        }
    }
}

/// 一个用户对一道题的答案
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub user_id: UserId,
    pub payload: AnswerPayload,
    /// 每次覆盖写入加一，首次写入为0
    pub revision: u32,
}
