use thiserror::Error;

use crate::models::ids::{MessageId, QuestionId, TestId};

/// 诊断信息中截断文本的最大长度
const MAX_SNIPPET_LEN: usize = 50;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 表单结构转换错误
    #[error("表单转换错误: {0}")]
    Translation(#[from] TranslationError),
    /// 导航错误（测试或题目已被删除）
    #[error("导航错误: {0}")]
    Navigation(#[from] NavigationError),
    /// 提交答案错误
    #[error("提交错误: {0}")]
    Submission(#[from] SubmissionError),
    /// 存储层错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 聊天传输错误
    #[error("聊天传输错误: {0}")]
    Chat(#[from] ChatError),
    /// 调度器已关闭，不再接受新的事件
    #[error("调度器已关闭")]
    DispatcherClosed,
}

/// 表单结构转换错误
///
/// `ordinal` 均为题目在表单中的位置（从1开始）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("无法解析表单 JSON: {snippet}")]
    MalformedDocument { snippet: String },
    #[error("表单中没有任何题目")]
    EmptyForm,
    #[error("表单缺少字段 '{field}'")]
    MissingField { field: &'static str },
    #[error("题目 №{ordinal}: 缺少标题，无法解析")]
    MissingTitle { ordinal: usize },
    #[error("题目 №{ordinal}: 标题为空")]
    EmptyPrompt { ordinal: usize },
    #[error("题目 №{ordinal} - {title}: 缺少 questionId")]
    MissingQuestionId { ordinal: usize, title: String },
    #[error("题目 №{ordinal} - {title}: 不支持该类型的题目")]
    UnsupportedItem { ordinal: usize, title: String },
    #[error("题目 №{ordinal} - {title}: 不支持的选择题类型 '{choice_type}'")]
    UnsupportedChoiceType {
        ordinal: usize,
        title: String,
        choice_type: String,
    },
    #[error("题目 №{ordinal} - {title}: 选择题没有可用选项")]
    NoOptions { ordinal: usize, title: String },
    #[error("题目 №{ordinal} - {title}: 无法解析选项")]
    MalformedOption { ordinal: usize, title: String },
    #[error("题目 №{ordinal} - {title}: questionId '{external_id}' 重复")]
    DuplicateQuestionId {
        ordinal: usize,
        title: String,
        external_id: String,
    },
}

/// 导航错误
///
/// 只在流程内部恢复（重置到 Idle），不会作为原始错误展示给用户
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("测试 {0} 已不存在")]
    TestVanished(TestId),
    #[error("题目 {question_id} 已不存在 (测试 {test_id})")]
    QuestionVanished {
        test_id: TestId,
        question_id: QuestionId,
    },
    /// 当前状态不接受该操作，按忽略处理
    #[error("状态 {phase} 不接受操作 {step}")]
    InvalidTransition {
        phase: &'static str,
        step: &'static str,
    },
}

impl NavigationError {
    /// 测试或题目被删除
    pub fn is_vanished(&self) -> bool {
        matches!(
            self,
            NavigationError::TestVanished(_) | NavigationError::QuestionVanished { .. }
        )
    }
}

/// 提交答案错误
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// 持久化的表单数据无法解析
    #[error("解析表单 JSON 失败: {snippet}")]
    JsonParse { snippet: String },
    /// 无法构造提交链接
    #[error("构造提交链接失败: {reason}")]
    UrlFailedCreation { reason: String },
    /// 网络请求失败或返回非 2xx
    #[error("提交请求失败 (状态码: {status:?}): {url}")]
    BadRequest {
        url: String,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },
    /// 返回的页面无法识别
    #[error("无法解析提交后的页面: {snippet}")]
    HtmlParse { snippet: String },
    /// 表单服务拒绝了这组答案
    #[error("答案提交被拒绝，请检查答案是否符合表单要求")]
    TestCompleteFail,
}

/// 存储层错误，属于致命错误，必须向上传播
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("存储锁已损坏")]
    Poisoned,
    #[error("导航状态版本冲突: 期望 {expected}, 实际 {found}")]
    VersionConflict { expected: u64, found: u64 },
}

/// 聊天传输错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("发送消息失败: {reason}")]
    SendFailed { reason: String },
    #[error("删除消息 {message_id} 失败: {reason}")]
    DeleteFailed { message_id: MessageId, reason: String },
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("无效的配置项 {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

// ========== 便捷构造函数 ==========

impl SubmissionError {
    pub fn json_parse(metadata: &str) -> Self {
        SubmissionError::JsonParse {
            snippet: shorten(metadata),
        }
    }

    pub fn url_failed(reason: impl Into<String>) -> Self {
        SubmissionError::UrlFailedCreation {
            reason: reason.into(),
        }
    }

    pub fn html_parse(html: &str) -> Self {
        SubmissionError::HtmlParse {
            snippet: shorten(html),
        }
    }

    /// 提交失败时展示给用户的提示
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmissionError::JsonParse { .. } => "很抱歉，测试数据出现错误，请稍后再试",
            SubmissionError::UrlFailedCreation { .. } => "很抱歉，答案数据有误，无法生成提交链接",
            SubmissionError::BadRequest { .. } => "很抱歉，连接表单服务失败，请稍后再试",
            SubmissionError::HtmlParse { .. } => "很抱歉，无法确认提交结果，请稍后再试",
            SubmissionError::TestCompleteFail => "答案被表单拒绝，请检查答案后重新提交",
        }
    }
}

impl TranslationError {
    pub fn malformed(raw: &str) -> Self {
        TranslationError::MalformedDocument {
            snippet: shorten(raw),
        }
    }
}

/// 截断过长的诊断文本
pub fn shorten(data: &str) -> String {
    if data.chars().count() < MAX_SNIPPET_LEN {
        data.to_string()
    } else {
        data.chars().take(MAX_SNIPPET_LEN).collect::<String>() + "..."
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
