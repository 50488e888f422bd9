//! 题目类型能力 - 业务能力层
//!
//! 每种题目类型的展示、校验、记录答案、编码提交参数。
//! 内部保存选项序号，表单服务需要选项原文，两者只在 `encode_for_submission` 里转换。

use url::form_urlencoded;

use crate::error::SubmissionError;
use crate::models::answer::AnswerPayload;
use crate::models::descriptor::{QuestionDescriptor, QuestionKind};
use crate::models::ids::OptionIndex;
use crate::models::render::{RenderRequest, RenderedOption};

/// 用户输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// 直接发送的文本消息
    Text(String),
    /// 点击选项
    Selection(OptionIndex),
}

/// 对已有答案的修改
///
/// 交给 `AnswerStore::upsert` 作为 mutator 使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerUpdate {
    /// 整体替换
    Replace(AnswerPayload),
    /// 切换一个选项
    Toggle(OptionIndex),
}

impl AnswerUpdate {
    pub fn apply(&self, prior: &AnswerPayload) -> AnswerPayload {
        match self {
            AnswerUpdate::Replace(payload) => payload.clone(),
            AnswerUpdate::Toggle(index) => prior.toggled(*index),
        }
    }
}

/// 提交参数 (参数名, 已编码的值)
pub type SubmissionPair = (String, String);

impl QuestionKind {
    /// 是否把用户下一条文本消息当作答案
    pub fn requires_freeform_input(self) -> bool {
        matches!(self, QuestionKind::FreeText)
    }

    /// 生成题目展示内容，已选选项会被标记
    pub fn render_prompt(
        self,
        descriptor: &QuestionDescriptor,
        prior_answer: Option<&AnswerPayload>,
    ) -> RenderRequest {
        let mut text = descriptor.prompt.clone();
        if let Some(description) = &descriptor.description {
            text.push_str("\n\n");
            text.push_str(description);
        }

        let prior = prior_answer.unwrap_or(&AnswerPayload::Empty);

        let options = match self {
            QuestionKind::FreeText => {
                if let AnswerPayload::Text(current) = prior {
                    text.push_str(&format!("\n\n当前答案: {}", current));
                }
                text.push_str("\n\n请直接发送文本作为答案");
                Vec::new()
            }
            QuestionKind::SingleChoice | QuestionKind::MultiChoice => {
                let options: Vec<RenderedOption> = descriptor
                    .options
                    .iter()
                    .enumerate()
                    .filter_map(|(position, label)| {
                        let index = OptionIndex::from_position(position)?;
                        Some(RenderedOption {
                            index,
                            label: label.clone(),
                            selected: prior.is_selected(index),
                        })
                    })
                    .collect();

                text.push_str(if self == QuestionKind::MultiChoice {
                    "\n\n选项（可多选）:\n"
                } else {
                    "\n\n选项:\n"
                });
                for option in &options {
                    let marker = if option.selected { "✅" } else { "▫️" };
                    text.push_str(&format!("{} 选项 {}: {}\n", marker, option.index, option.label));
                }
                options
            }
        };

        RenderRequest {
            text,
            media: descriptor.media.clone(),
            options,
            expects_freeform: self.requires_freeform_input(),
        }
    }

    /// 校验原始输入：文本题拒绝空文本，选择题总是接受
    pub fn validate_raw_input(self, input: &str) -> bool {
        match self {
            QuestionKind::FreeText => !input.trim().is_empty(),
            QuestionKind::SingleChoice | QuestionKind::MultiChoice => true,
        }
    }

    /// 将用户输入转换为答案修改
    ///
    /// 输入与题目类型不匹配或者选项越界时返回 None
    pub fn capture_answer(
        self,
        input: &UserInput,
        descriptor: &QuestionDescriptor,
    ) -> Option<AnswerUpdate> {
        match (self, input) {
            (QuestionKind::FreeText, UserInput::Text(text)) if self.validate_raw_input(text) => {
                Some(AnswerUpdate::Replace(AnswerPayload::Text(text.clone())))
            }
            (QuestionKind::SingleChoice, UserInput::Selection(index))
                if index.position() < descriptor.options.len() =>
            {
                Some(AnswerUpdate::Replace(AnswerPayload::single(*index)))
            }
            (QuestionKind::MultiChoice, UserInput::Selection(index))
                if index.position() < descriptor.options.len() =>
            {
                Some(AnswerUpdate::Toggle(*index))
            }
            _ => None,
        }
    }

    /// 编码为提交参数
    ///
    /// 选择题提交选项原文（URL 编码），不提交序号
    pub fn encode_for_submission(
        self,
        answer: &AnswerPayload,
        descriptor: &QuestionDescriptor,
    ) -> Result<Vec<SubmissionPair>, SubmissionError> {
        let param = entry_param_name(descriptor);

        match (self, answer) {
            (_, AnswerPayload::Empty) => Err(SubmissionError::url_failed(format!(
                "题目 {} 没有已保存的答案",
                descriptor.external_id
            ))),
            (QuestionKind::FreeText, AnswerPayload::Text(text)) => {
                Ok(vec![(param, encode_value(text))])
            }
            (QuestionKind::SingleChoice, AnswerPayload::Selected(set)) if set.len() == 1 => set
                .iter()
                .map(|index| option_text(descriptor, *index).map(|text| (param.clone(), encode_value(text))))
                .collect(),
            (QuestionKind::MultiChoice, AnswerPayload::Selected(set)) => set
                .iter()
                .map(|index| option_text(descriptor, *index).map(|text| (param.clone(), encode_value(text))))
                .collect(),
            (kind, payload) => Err(SubmissionError::url_failed(format!(
                "题目 {} 的答案 {:?} 与题目类型 {} 不匹配",
                descriptor.external_id,
                payload.to_strings(),
                kind
            ))),
        }
    }

    /// 把提交的编码值还原为选项序号（仅选择题）
    pub fn decode_submitted_value(
        self,
        value: &str,
        descriptor: &QuestionDescriptor,
    ) -> Option<OptionIndex> {
        if !self.has_options() {
            return None;
        }
        let literal = decode_value(value)?;
        descriptor
            .options
            .iter()
            .position(|option| *option == literal)
            .and_then(OptionIndex::from_position)
    }
}

/// 提交参数名 `entry.<questionId>`
pub fn entry_param_name(descriptor: &QuestionDescriptor) -> String {
    format!("entry.{}", descriptor.external_id)
}

fn option_text(descriptor: &QuestionDescriptor, index: OptionIndex) -> Result<&str, SubmissionError> {
    descriptor.option(index.get()).ok_or_else(|| {
        SubmissionError::url_failed(format!(
            "题目 {} 没有选项 {} (共 {} 个)",
            descriptor.external_id,
            index,
            descriptor.options.len()
        ))
    })
}

fn encode_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn decode_value(value: &str) -> Option<String> {
    form_urlencoded::parse(format!("v={}", value).as_bytes())
        .next()
        .map(|(_, decoded)| decoded.into_owned())
}
