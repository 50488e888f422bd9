//! 表单提交客户端
//!
//! 把答案拼成表单服务的公开提交链接，发出一次 GET 请求并识别返回页面
use regex::Regex;
use reqwest::Client;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::SubmissionError;
use crate::models::ids::QuestionId;
use crate::services::question_kinds::SubmissionPair;
use crate::services::schema_translator::SchemaTranslator;
use crate::utils::truncate_text;

/// 每道题的提交参数
pub type EncodedAnswers = BTreeMap<QuestionId, Vec<SubmissionPair>>;

/// 表单提交客户端
pub struct FormResponseClient {
    http: Client,
    base_url: String,
}

impl FormResponseClient {
    /// 创建新的提交客户端
    ///
    /// 请求超时取自 `config.request_timeout()`
    pub fn new(config: &Config) -> Result<Self, SubmissionError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SubmissionError::BadRequest {
                url: config.provider_base_url.clone(),
                status: None,
                source: Some(e),
            })?;

        Ok(Self {
            http,
            base_url: config.provider_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 提交答案
    ///
    /// # 参数
    /// - `responder_uri`: 表单的 responderUri
    /// - `answers`: 每道题已编码的 (参数名, 值)
    ///
    /// # 返回
    /// 表单服务接受答案时返回 Ok
    pub async fn submit(
        &self,
        responder_uri: &str,
        answers: &EncodedAnswers,
    ) -> Result<(), SubmissionError> {
        let url = self.build_response_url(responder_uri, answers)?;
        debug!("提交链接: {}", truncate_text(&url, 200));

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SubmissionError::BadRequest {
                url: url.clone(),
                status: e.status().map(|s| s.as_u16()),
                source: Some(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("❌ 表单服务返回状态码 {}", status);
            return Err(SubmissionError::BadRequest {
                url,
                status: Some(status.as_u16()),
                source: None,
            });
        }

        let body = response.text().await.map_err(|e| SubmissionError::BadRequest {
            url: url.clone(),
            status: Some(status.as_u16()),
            source: Some(e),
        })?;

        classify_response(&body)?;
        info!("✅ 表单服务已接受答案 ({} 道题)", answers.len());
        Ok(())
    }

    /// 按持久化的表单 JSON 提交答案
    pub async fn submit_metadata(
        &self,
        form_metadata: &str,
        answers: &EncodedAnswers,
    ) -> Result<(), SubmissionError> {
        let responder_uri = SchemaTranslator::responder_uri(form_metadata)
            .map_err(|_| SubmissionError::json_parse(form_metadata))?;
        self.submit(&responder_uri, answers).await
    }

    /// 构造提交链接
    ///
    /// 形如 `<base>/forms/d/e/<formId>/formResponse?&submit=Submit?&entry.<id>=<value>&...`
    pub fn build_response_url(
        &self,
        responder_uri: &str,
        answers: &EncodedAnswers,
    ) -> Result<String, SubmissionError> {
        let form_id = extract_form_id(responder_uri)?;

        let pairs: Vec<&SubmissionPair> = answers.values().flatten().collect();
        if pairs.is_empty() {
            return Err(SubmissionError::url_failed("没有任何可提交的答案"));
        }

        let mut url = format!(
            "{}/forms/d/e/{}/formResponse?&submit=Submit?",
            self.base_url, form_id
        );
        for (name, value) in pairs {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(value);
        }

        url::Url::parse(&url).map_err(|e| SubmissionError::url_failed(format!("{}: {}", e, url)))?;
        Ok(url)
    }
}

/// 从 responderUri 中提取 formId（倒数第二段路径）
pub fn extract_form_id(responder_uri: &str) -> Result<String, SubmissionError> {
    let parsed = url::Url::parse(responder_uri)
        .map_err(|e| SubmissionError::url_failed(format!("无效的 responderUri '{}': {}", responder_uri, e)))?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match segments.len() {
        n if n >= 2 => Ok(segments[n - 2].to_string()),
        _ => Err(SubmissionError::url_failed(format!(
            "responderUri 中找不到 formId: {}",
            responder_uri
        ))),
    }
}

/// 任意 HTML 标签
const ANY_TAG_PATTERN: &str = r"<[A-Za-z!/][^>]*>";
/// 表单标签（不匹配 `<formula>` 之类）
const FORM_TAG_PATTERN: &str = r"(?i)<form[\s>/]";

/// 识别提交后的页面
///
/// - 不是 HTML → `HtmlParse`
/// - 页面中仍有表单 → `TestCompleteFail`（答案被拒绝）
/// - 否则为成功
pub fn classify_response(body: &str) -> Result<(), SubmissionError> {
    let any_tag = Regex::new(ANY_TAG_PATTERN).map_err(|_| SubmissionError::html_parse(body))?;
    let form_tag = Regex::new(FORM_TAG_PATTERN).map_err(|_| SubmissionError::html_parse(body))?;

    if body.trim().is_empty() || !any_tag.is_match(body) {
        return Err(SubmissionError::html_parse(body));
    }
    if form_tag.is_match(body) {
        return Err(SubmissionError::TestCompleteFail);
    }
    Ok(())
}
