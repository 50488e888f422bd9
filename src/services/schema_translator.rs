//! 表单转换服务 - 业务能力层
//!
//! 只负责"把表单服务的题目树转换为题目描述"，全部成功或全部失败

use std::collections::HashSet;

use tracing::debug;

use crate::error::TranslationError;
use crate::models::descriptor::{QuestionDescriptor, QuestionKind};
use crate::models::form::{RawChoiceQuestion, RawForm, RawItem, RawQuestion};

/// 表单转换服务
///
/// 职责：
/// - 按表单返回的顺序转换题目，`order` 取从1开始的枚举序号
/// - 任意一道题无法转换时整个表单失败，不返回部分结果
/// - 无状态，可在任意线程并发调用
pub struct SchemaTranslator;

impl SchemaTranslator {
    /// 转换整个表单
    pub fn translate(raw_form: &str) -> Result<Vec<QuestionDescriptor>, TranslationError> {
        let form = Self::parse(raw_form)?;
        Self::translate_form(&form)
    }

    /// 转换已反序列化的表单
    pub fn translate_form(form: &RawForm) -> Result<Vec<QuestionDescriptor>, TranslationError> {
        if form.items.is_empty() {
            return Err(TranslationError::EmptyForm);
        }

        let mut seen_ids = HashSet::new();
        let mut descriptors = Vec::with_capacity(form.items.len());

        for (index, item) in form.items.iter().enumerate() {
            let ordinal = index + 1;
            let descriptor = Self::translate_item(ordinal, item)?;

            if !seen_ids.insert(descriptor.external_id.clone()) {
                return Err(TranslationError::DuplicateQuestionId {
                    ordinal,
                    title: descriptor.prompt,
                    external_id: descriptor.external_id,
                });
            }

            debug!(
                "题目 №{} 转换完成: {} ({})",
                ordinal, descriptor.external_id, descriptor.kind
            );
            descriptors.push(descriptor);
        }

        Ok(descriptors)
    }

    /// 获取表单的 responderUri
    pub fn responder_uri(raw_form: &str) -> Result<String, TranslationError> {
        Self::parse(raw_form)?
            .responder_uri
            .filter(|uri| !uri.trim().is_empty())
            .ok_or(TranslationError::MissingField {
                field: "responderUri",
            })
    }

    /// 获取表单标题（仅用于展示）
    pub fn form_title(raw_form: &str) -> Result<String, TranslationError> {
        let form = Self::parse(raw_form)?;
        form.info
            .and_then(|info| info.title.or(info.document_title))
            .filter(|title| !title.trim().is_empty())
            .ok_or(TranslationError::MissingField { field: "info.title" })
    }

    pub fn parse(raw_form: &str) -> Result<RawForm, TranslationError> {
        serde_json::from_str(raw_form).map_err(|_| TranslationError::malformed(raw_form))
    }

    // ========== 单个题目 ==========

    fn translate_item(ordinal: usize, item: &RawItem) -> Result<QuestionDescriptor, TranslationError> {
        let title = item
            .title
            .as_deref()
            .ok_or(TranslationError::MissingTitle { ordinal })?;
        if title.trim().is_empty() {
            return Err(TranslationError::EmptyPrompt { ordinal });
        }

        // 没有 questionItem 的条目（矩阵题、分页、说明文字等）不支持
        let question_item = item
            .question_item
            .as_ref()
            .ok_or_else(|| unsupported(ordinal, title))?;
        let question = question_item
            .question
            .as_ref()
            .ok_or_else(|| unsupported(ordinal, title))?;

        let external_id = question
            .question_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| TranslationError::MissingQuestionId {
                ordinal,
                title: title.to_string(),
            })?;

        let kind = Self::resolve_kind(ordinal, title, question)?;

        let (options, has_other_option) = match (&question.choice_question, kind.has_options()) {
            (Some(choice), true) => Self::extract_options(ordinal, title, choice)?,
            _ => (Vec::new(), false),
        };

        // 媒体提取失败不算错误
        let media = question_item
            .image
            .as_ref()
            .and_then(|image| image.content_uri.clone())
            .filter(|uri| !uri.is_empty());

        Ok(QuestionDescriptor {
            external_id,
            order: ordinal as u32,
            prompt: title.to_string(),
            description: item.description.clone().filter(|d| !d.is_empty()),
            required: question.required.unwrap_or(false),
            media,
            kind,
            options,
            has_other_option,
        })
    }

    fn resolve_kind(
        ordinal: usize,
        title: &str,
        question: &RawQuestion,
    ) -> Result<QuestionKind, TranslationError> {
        if question.text_question.is_some() {
            return Ok(QuestionKind::FreeText);
        }

        let choice = question
            .choice_question
            .as_ref()
            .ok_or_else(|| unsupported(ordinal, title))?;

        match choice.choice_type.as_deref() {
            Some("single") | Some("RADIO") => Ok(QuestionKind::SingleChoice),
            Some("multi") | Some("CHECKBOX") => Ok(QuestionKind::MultiChoice),
            other => Err(TranslationError::UnsupportedChoiceType {
                ordinal,
                title: title.to_string(),
                choice_type: other.unwrap_or_default().to_string(),
            }),
        }
    }

    /// 提取选项，"其他"选项只记录标记，不加入列表
    fn extract_options(
        ordinal: usize,
        title: &str,
        choice: &RawChoiceQuestion,
    ) -> Result<(Vec<String>, bool), TranslationError> {
        let mut options = Vec::with_capacity(choice.options.len());
        let mut has_other = false;

        for option in &choice.options {
            match (&option.value, option.is_other) {
                (Some(value), _) => options.push(value.clone()),
                (None, Some(true)) => has_other = true,
                _ => {
                    return Err(TranslationError::MalformedOption {
                        ordinal,
                        title: title.to_string(),
                    })
                }
            }
        }

        if options.is_empty() {
            return Err(TranslationError::NoOptions {
                ordinal,
                title: title.to_string(),
            });
        }

        Ok((options, has_other))
    }
}

fn unsupported(ordinal: usize, title: &str) -> TranslationError {
    TranslationError::UnsupportedItem {
        ordinal,
        title: title.to_string(),
    }
}
