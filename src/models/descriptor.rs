use serde::{Deserialize, Serialize};

/// 题目类型（封闭集合）
///
/// 各类型的行为见 `services::question_kinds`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    /// 文本题
    FreeText,
    /// 单选题
    SingleChoice,
    /// 多选题
    MultiChoice,
}

impl QuestionKind {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            QuestionKind::FreeText => "FreeText",
            QuestionKind::SingleChoice => "SingleChoice",
            QuestionKind::MultiChoice => "MultiChoice",
        }
    }

    /// 是否带选项
    pub fn has_options(self) -> bool {
        !matches!(self, QuestionKind::FreeText)
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题目描述（表单转换的结果）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDescriptor {
    /// 表单服务分配的题目 ID，提交答案时原样使用
    pub external_id: String,
    /// 在表单中的位置（从1开始）
    pub order: u32,
    /// 题干
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 仅供展示，不在本系统内校验
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    pub kind: QuestionKind,
    /// 选项（仅选择题）
    #[serde(default)]
    pub options: Vec<String>,
    /// 表单中存在"其他"选项（本系统不支持，只做记录）
    #[serde(default)]
    pub has_other_option: bool,
}

impl QuestionDescriptor {
    /// 按从1开始的序号取选项文本
    pub fn option(&self, one_based: u32) -> Option<&str> {
        let position = (one_based as usize).checked_sub(1)?;
        self.options.get(position).map(String::as_str)
    }
}
