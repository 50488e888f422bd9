//! 测试目录 - 业务能力层
//!
//! 保存由表单导入的测试；删除测试即作者删除了它，进行中的用户会在下一步收到提示

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::error::{AppResult, StoreError, TranslationError};
use crate::models::ids::{QuestionId, TestId};
use crate::models::quiz_test::{QuizTest, StoredQuestion};
use crate::services::schema_translator::SchemaTranslator;

/// 没有标题时的显示名称
const UNTITLED_TEST: &str = "未命名测试";

pub trait TestCatalog: Send + Sync {
    /// 导入表单 JSON 为新测试
    ///
    /// 转换失败时不会保存任何内容
    fn import_form(&self, title: Option<&str>, raw_form: &str) -> AppResult<Arc<QuizTest>>;

    fn get(&self, test_id: TestId) -> Result<Option<Arc<QuizTest>>, StoreError>;

    fn remove(&self, test_id: TestId) -> Result<Option<Arc<QuizTest>>, StoreError>;

    fn list(&self) -> Result<Vec<Arc<QuizTest>>, StoreError>;
}

impl QuizTest {
    /// 由表单 JSON 构建测试
    ///
    /// # 参数
    /// - `id`: 测试 ID
    /// - `title`: 作者指定的标题，为空时使用表单标题
    /// - `raw_form`: 表单 JSON
    /// - `next_question_id`: 为每道题分配 ID
    pub fn from_form_json(
        id: TestId,
        title: Option<&str>,
        raw_form: &str,
        mut next_question_id: impl FnMut() -> QuestionId,
    ) -> Result<Self, TranslationError> {
        let form = SchemaTranslator::parse(raw_form)?;
        let descriptors = SchemaTranslator::translate_form(&form)?;
        let responder_uri = SchemaTranslator::responder_uri(raw_form)?;

        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => SchemaTranslator::form_title(raw_form).unwrap_or_else(|_| UNTITLED_TEST.to_string()),
        };

        let questions = descriptors
            .into_iter()
            .map(|descriptor| StoredQuestion {
                id: next_question_id(),
                descriptor,
            })
            .collect();

        Ok(QuizTest::new(
            id,
            title,
            responder_uri,
            raw_form.to_string(),
            questions,
        ))
    }
}

/// 内存测试目录
pub struct InMemoryTestCatalog {
    tests: RwLock<BTreeMap<TestId, Arc<QuizTest>>>,
    next_test_id: AtomicU64,
    next_question_id: AtomicU64,
}

impl InMemoryTestCatalog {
    pub fn new() -> Self {
        Self {
            tests: RwLock::new(BTreeMap::new()),
            next_test_id: AtomicU64::new(1),
            next_question_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryTestCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCatalog for InMemoryTestCatalog {
    fn import_form(&self, title: Option<&str>, raw_form: &str) -> AppResult<Arc<QuizTest>> {
        let test_id = TestId(self.next_test_id.fetch_add(1, Ordering::Relaxed));
        let test = QuizTest::from_form_json(test_id, title, raw_form, || {
            QuestionId(self.next_question_id.fetch_add(1, Ordering::Relaxed))
        })?;

        info!(
            "📥 导入测试 #{} 「{}」: {} 道题",
            test.id,
            test.title,
            test.questions.len()
        );

        let test = Arc::new(test);
        self.tests
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(test_id, test.clone());
        Ok(test)
    }

    fn get(&self, test_id: TestId) -> Result<Option<Arc<QuizTest>>, StoreError> {
        Ok(self
            .tests
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(&test_id)
            .cloned())
    }

    fn remove(&self, test_id: TestId) -> Result<Option<Arc<QuizTest>>, StoreError> {
        let removed = self
            .tests
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .remove(&test_id);
        if removed.is_some() {
            info!("🗑️ 删除测试 #{}", test_id);
        }
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<Arc<QuizTest>>, StoreError> {
        Ok(self
            .tests
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .values()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    fn form(title: &str, items: serde_json::Value) -> String {
        json!({
            "formId": "1FAIpQLSe",
            "info": { "title": title, "documentTitle": "文档标题" },
            "responderUri": "https://docs.google.com/forms/d/e/1FAIpQLSe/viewform",
            "items": items
        })
        .to_string()
    }

    fn two_items() -> serde_json::Value {
        json!([
            { "title": "Name?", "questionItem": { "question": { "questionId": "1a2b", "textQuestion": {} } } },
            { "title": "Pick", "questionItem": { "question": { "questionId": "3c4d",
                "choiceQuestion": { "type": "RADIO", "options": [{ "value": "A" }, { "value": "B" }] } } } }
        ])
    }

    #[test]
    fn test_import_assigns_ids_and_keeps_metadata() {
        let catalog = InMemoryTestCatalog::new();
        let raw = form("小测验", two_items());
        let test = catalog.import_form(None, &raw).unwrap();

        assert_eq!(test.id, TestId(1));
        assert_eq!(test.title, "小测验");
        assert_eq!(test.form_metadata, raw);
        assert_eq!(test.question_ids(), vec![QuestionId(1), QuestionId(2)]);
        assert_eq!(test.responder_uri, "https://docs.google.com/forms/d/e/1FAIpQLSe/viewform");

        let second = catalog.import_form(Some("  第二套  "), &raw).unwrap();
        assert_eq!(second.id, TestId(2));
        assert_eq!(second.title, "第二套");
        assert_eq!(second.question_ids(), vec![QuestionId(3), QuestionId(4)]);
    }

    #[test]
    fn test_failed_import_stores_nothing() {
        let catalog = InMemoryTestCatalog::new();
        let raw = form(
            "坏表单",
            json!([{ "title": "矩阵", "questionItem": { "question": { "questionId": "9",
                "choiceQuestion": { "type": "GRID", "options": [{ "value": "x" }] } } } }]),
        );
        let err = catalog.import_form(None, &raw).unwrap_err();
        assert!(matches!(
            err,
            AppError::Translation(TranslationError::UnsupportedChoiceType { .. })
        ));
        assert!(catalog.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove_makes_test_vanish() {
        let catalog = InMemoryTestCatalog::new();
        let test = catalog.import_form(None, &form("t", two_items())).unwrap();
        assert!(catalog.remove(test.id).unwrap().is_some());
        assert!(catalog.get(test.id).unwrap().is_none());
        assert!(catalog.remove(test.id).unwrap().is_none());
    }
}
