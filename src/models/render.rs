use serde::Serialize;

use crate::models::ids::OptionIndex;

/// 渲染请求（交给聊天传输层展示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    pub options: Vec<RenderedOption>,
    /// 是否等待用户直接输入文本
    pub expects_freeform: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedOption {
    pub index: OptionIndex,
    pub label: String,
    pub selected: bool,
}

impl RenderRequest {
    pub fn selected_indices(&self) -> Vec<OptionIndex> {
        self.options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.index)
            .collect()
    }
}
