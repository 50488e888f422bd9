#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use form_quiz_bridge::error::ChatError;
use form_quiz_bridge::infrastructure::ChatPort;
use form_quiz_bridge::models::{
    MessageId, NavPhase, QuizTest, RenderRequest, UserId,
};
use form_quiz_bridge::services::{
    FailureLog, InMemoryAnswerStore, InMemoryNavigationStore, InMemoryTestCatalog,
    NavigationStore, TestCatalog,
};
use form_quiz_bridge::{Config, FlowOutcome, FormResponseClient, QuizEvent, QuizFlow};

pub const USER: UserId = UserId(42);

pub const ACCEPTED_PAGE: &str = "<html><body><div>Ваш ответ записан.</div></body></html>";
pub const REJECTED_PAGE: &str =
    r#"<html><body><form action="/forms/d/e/FORM/formResponse" method="POST"></form></body></html>"#;

/// 三道题：文本题、单选题、多选题
pub fn sample_form() -> String {
    json!({
        "formId": "FORM",
        "info": { "title": "Анкета" },
        "responderUri": "https://docs.google.com/forms/d/e/FORM/viewform",
        "items": [
            { "title": "Name?", "questionItem": { "question": {
                "questionId": "1a2b", "textQuestion": {} } } },
            { "title": "Pick", "questionItem": {
                "question": { "questionId": "3c4d", "choiceQuestion": {
                    "type": "RADIO", "options": [{ "value": "A" }, { "value": "B" }] } },
                "image": { "contentUri": "https://example.com/pick.png" } } },
            { "title": "Colors", "questionItem": { "question": {
                "questionId": "5e6f", "choiceQuestion": {
                    "type": "CHECKBOX",
                    "options": [{ "value": "Red" }, { "value": "Green" }, { "value": "Blue" }] } } } }
        ]
    })
    .to_string()
}

// ========== 聊天传输 ==========

#[derive(Default)]
pub struct FakeChat {
    next_id: Mutex<i32>,
    pub renders: Mutex<Vec<(RenderRequest, Vec<MessageId>)>>,
    pub notices: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<MessageId>>,
    /// 为 true 时所有删除都失败
    pub fail_deletes: AtomicBool,
}

impl FakeChat {
    fn allocate(&self) -> MessageId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        MessageId(*next)
    }

    pub fn last_render(&self) -> (RenderRequest, Vec<MessageId>) {
        self.renders.lock().unwrap().last().cloned().unwrap()
    }

    pub fn last_notice(&self) -> String {
        self.notices.lock().unwrap().last().cloned().unwrap()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPort for FakeChat {
    async fn render(&self, _user_id: UserId, request: &RenderRequest) -> Result<Vec<MessageId>, ChatError> {
        let mut ids = Vec::new();
        if request.media.is_some() {
            ids.push(self.allocate());
        }
        ids.push(self.allocate());
        self.renders.lock().unwrap().push((request.clone(), ids.clone()));
        Ok(ids)
    }

    async fn notify(&self, _user_id: UserId, text: &str) -> Result<MessageId, ChatError> {
        self.notices.lock().unwrap().push(text.to_string());
        Ok(self.allocate())
    }

    async fn delete(&self, _user_id: UserId, message_id: MessageId) -> Result<(), ChatError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ChatError::DeleteFailed {
                message_id,
                reason: "message is too old".to_string(),
            });
        }
        self.deleted.lock().unwrap().push(message_id);
        Ok(())
    }
}

// ========== 表单服务 ==========

pub struct MockFormServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl MockFormServer {
    pub fn request_lines(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// 启动一个本地 HTTP 服务，对每个请求返回同样的响应，并记录请求行
pub async fn spawn_form_server(status: u16, body: &'static str) -> MockFormServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }

            let request = String::from_utf8_lossy(&buf).to_string();
            let line = request.lines().next().unwrap_or_default().to_string();
            seen.lock().unwrap().push(line);

            let response = format!(
                "HTTP/1.1 {} Mock\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    MockFormServer {
        base_url: format!("http://{}", addr),
        requests,
    }
}

pub fn config_for(base_url: &str, failure_log: &Path) -> Config {
    Config {
        provider_base_url: base_url.to_string(),
        request_timeout_secs: 5,
        failure_log_file: failure_log.to_string_lossy().to_string(),
        ..Config::default()
    }
}

// ========== 流程 ==========

pub struct Harness {
    pub flow: Arc<QuizFlow>,
    pub catalog: Arc<InMemoryTestCatalog>,
    pub answers: Arc<InMemoryAnswerStore>,
    pub navigation: Arc<InMemoryNavigationStore>,
    pub chat: Arc<FakeChat>,
    pub failure_log: PathBuf,
    _dir: TempDir,
}

impl Harness {
    pub fn new(base_url: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let failure_log = dir.path().join("failures.txt");
        let config = config_for(base_url, &failure_log);

        let catalog = Arc::new(InMemoryTestCatalog::new());
        let answers = Arc::new(InMemoryAnswerStore::new());
        let navigation = Arc::new(InMemoryNavigationStore::new());
        let chat = Arc::new(FakeChat::default());

        let flow = QuizFlow::new(
            catalog.clone(),
            answers.clone(),
            navigation.clone(),
            chat.clone(),
            FormResponseClient::new(&config).unwrap(),
            FailureLog::with_path(config.failure_log_file.clone()),
        );

        Self {
            flow: Arc::new(flow),
            catalog,
            answers,
            navigation,
            chat,
            failure_log,
            _dir: dir,
        }
    }

    pub fn import_sample(&self) -> Arc<QuizTest> {
        self.catalog.import_form(None, &sample_form()).unwrap()
    }

    pub async fn send(&self, event: QuizEvent) -> FlowOutcome {
        self.flow.handle(USER, event).await.unwrap()
    }

    pub fn phase(&self) -> NavPhase {
        self.navigation.load(USER).unwrap().phase
    }
}
