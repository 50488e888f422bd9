//! 表单服务返回的原始表单结构
//!
//! 字段均为可选：是否支持某种结构由 `SchemaTranslator` 决定，这里只负责反序列化

use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawForm {
    #[serde(default)]
    pub form_id: Option<String>,
    #[serde(default)]
    pub info: Option<RawInfo>,
    #[serde(default)]
    pub responder_uri: Option<String>,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub document_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub question_item: Option<RawQuestionItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuestionItem {
    #[serde(default)]
    pub question: Option<RawQuestion>,
    #[serde(default)]
    pub image: Option<RawImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuestion {
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub text_question: Option<JsonValue>,
    #[serde(default)]
    pub choice_question: Option<RawChoiceQuestion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChoiceQuestion {
    #[serde(rename = "type", default)]
    pub choice_type: Option<String>,
    #[serde(default)]
    pub options: Vec<RawOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOption {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub is_other: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImage {
    #[serde(default)]
    pub content_uri: Option<String>,
}
