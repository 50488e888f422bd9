//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置、创建存储和提交客户端、组装 `QuizFlow`
//! 2. **导入表单**：启动时导入 `form_json_path` 指向的文件或目录
//! 3. **资源所有者**：唯一持有聊天传输和存储的模块
//! 4. **终端会话**：从标准输入读取命令，交给 `Dispatcher`

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::clients::FormResponseClient;
use crate::config::Config;
use crate::infrastructure::ConsoleChat;
use crate::models::ids::{MessageId, OptionIndex, QuestionId, TestId, UserId};
use crate::models::loaders::{load_all_form_files, load_form_json};
use crate::orchestrator::dispatcher::Dispatcher;
use crate::services::{
    FailureLog, InMemoryAnswerStore, InMemoryNavigationStore, InMemoryTestCatalog,
    NavigationStore, TestCatalog,
};
use crate::utils::logging::log_startup;
use crate::workflow::{FlowOutcome, QuizEvent, QuizFlow};

/// 终端会话使用的用户
const CONSOLE_USER: UserId = UserId(1);

/// 终端命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Event(QuizEvent),
    ListTests,
    Import(String),
    Remove(TestId),
    Quit,
    Help,
}

/// 应用主结构
pub struct App {
    config: Config,
    catalog: Arc<InMemoryTestCatalog>,
    navigation: Arc<InMemoryNavigationStore>,
    chat: Arc<ConsoleChat>,
    dispatcher: Arc<Dispatcher>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置无效")?;
        log_startup(&config);

        let catalog = Arc::new(InMemoryTestCatalog::new());
        let navigation = Arc::new(InMemoryNavigationStore::new());
        let chat = Arc::new(ConsoleChat::new());

        let submitter = FormResponseClient::new(&config).context("无法创建提交客户端")?;
        let flow = QuizFlow::new(
            catalog.clone(),
            Arc::new(InMemoryAnswerStore::new()),
            navigation.clone(),
            chat.clone(),
            submitter,
            FailureLog::with_path(config.failure_log_file.clone()),
        );
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(flow), config.max_concurrent_users));

        let app = Self {
            config,
            catalog,
            navigation,
            chat,
            dispatcher,
        };

        if let Some(path) = app.config.form_json_path.clone() {
            app.import_path(Path::new(&path)).await?;
        }

        Ok(app)
    }

    /// 运行终端会话，直到输入 `/quit` 或标准输入结束
    pub async fn run(&self) -> Result<()> {
        print_help();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await.context("读取标准输入失败")? {
            let current_question = self.navigation.load(CONSOLE_USER)?.current_question_id();
            let Some(command) = parse_command(&line, current_question, self.chat.next_message_id()) else {
                continue;
            };

            match command {
                ConsoleCommand::Quit => break,
                ConsoleCommand::Help => print_help(),
                ConsoleCommand::ListTests => self.list_tests()?,
                ConsoleCommand::Import(path) => {
                    if let Err(e) = self.import_path(Path::new(&path)).await {
                        error!("❌ 导入失败: {:#}", e);
                    }
                }
                ConsoleCommand::Remove(test_id) => {
                    if self.catalog.remove(test_id)?.is_none() {
                        warn!("⚠️ 测试 #{} 不存在", test_id);
                    }
                }
                ConsoleCommand::Event(event) => {
                    match self.dispatcher.dispatch(CONSOLE_USER, event).await {
                        Ok(FlowOutcome::SubmissionFailed(e)) => warn!("提交失败: {}", e),
                        Ok(outcome) => info!("→ {:?}", outcome),
                        Err(e) => error!("❌ 处理失败: {}", e),
                    }
                }
            }
        }

        info!("👋 会话结束");
        Ok(())
    }

    /// 导入单个表单文件，或目录中的全部表单文件
    async fn import_path(&self, path: &Path) -> Result<()> {
        let files = if path.is_dir() {
            load_all_form_files(&path.to_string_lossy()).await?
        } else {
            vec![load_form_json(path).await?]
        };

        for file in files {
            match self.catalog.import_form(None, &file.content) {
                Ok(test) => info!("✓ {} → 测试 #{}", file.path.display(), test.id),
                Err(e) => error!("❌ {} 导入失败: {}", file.path.display(), e),
            }
        }
        Ok(())
    }

    fn list_tests(&self) -> Result<()> {
        let tests = self.catalog.list()?;
        if tests.is_empty() {
            info!("⚠️ 还没有导入任何测试");
        }
        for test in tests {
            info!("#{} 「{}」 {} 道题", test.id, test.title, test.questions.len());
        }
        Ok(())
    }
}

/// 解析终端输入
///
/// # 参数
/// - `line`: 一行输入
/// - `current_question`: 当前展示的题目（`/pick` 需要）
/// - `message_id`: 普通文本消息使用的消息 ID
pub fn parse_command(
    line: &str,
    current_question: Option<QuestionId>,
    message_id: MessageId,
) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.starts_with('/') {
        return Some(ConsoleCommand::Event(QuizEvent::Message {
            message_id,
            text: line.to_string(),
        }));
    }

    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let arg = parts.next();
    let number = arg.and_then(|a| a.parse::<u64>().ok());

    let command = match command {
        "/quit" => ConsoleCommand::Quit,
        "/help" => ConsoleCommand::Help,
        "/tests" => ConsoleCommand::ListTests,
        "/import" => ConsoleCommand::Import(arg?.to_string()),
        "/remove" => ConsoleCommand::Remove(TestId(number?)),
        "/start" => ConsoleCommand::Event(QuizEvent::StartTest(TestId(number?))),
        "/next" => ConsoleCommand::Event(QuizEvent::Advance),
        "/open" => ConsoleCommand::Event(QuizEvent::OpenQuestion(QuestionId(number?))),
        "/pick" => {
            let option = OptionIndex::new(u32::try_from(number?).ok()?)?;
            ConsoleCommand::Event(QuizEvent::Select {
                question_id: current_question?,
                option,
            })
        }
        "/back" => ConsoleCommand::Event(QuizEvent::BackToQuestions),
        "/menu" => ConsoleCommand::Event(QuizEvent::ReturnToMenu),
        "/end" => ConsoleCommand::Event(QuizEvent::EndTest),
        _ => ConsoleCommand::Help,
    };
    Some(command)
}

fn print_help() {
    info!("{}", "=".repeat(60));
    info!("可用命令:");
    info!("  /tests            列出测试");
    info!("  /import <路径>    导入表单 JSON（文件或目录）");
    info!("  /remove <测试>    删除测试");
    info!("  /start <测试>     开始测试");
    info!("  /next             下一题");
    info!("  /open <题目>      打开题目");
    info!("  /pick <选项>      选择当前题目的选项");
    info!("  /back             回到题目列表");
    info!("  /menu             回到菜单");
    info!("  /end              结束并提交");
    info!("  /quit             退出");
    info!("  其他文本          作为文本题的答案");
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            parse_command("  Анна ", None, MessageId(9)),
            Some(ConsoleCommand::Event(QuizEvent::Message {
                message_id: MessageId(9),
                text: "Анна".to_string()
            }))
        );
        assert_eq!(parse_command("   ", None, MessageId(9)), None);
    }

    #[test]
    fn test_pick_targets_current_question() {
        assert_eq!(
            parse_command("/pick 2", Some(QuestionId(5)), MessageId(1)),
            Some(ConsoleCommand::Event(QuizEvent::Select {
                question_id: QuestionId(5),
                option: OptionIndex::new(2).unwrap(),
            }))
        );
        assert_eq!(parse_command("/pick 2", None, MessageId(1)), None);
        assert_eq!(parse_command("/pick 0", Some(QuestionId(5)), MessageId(1)), None);
    }

    #[test]
    fn test_navigation_commands() {
        assert_eq!(
            parse_command("/start 3", None, MessageId(1)),
            Some(ConsoleCommand::Event(QuizEvent::StartTest(TestId(3))))
        );
        assert_eq!(
            parse_command("/end", None, MessageId(1)),
            Some(ConsoleCommand::Event(QuizEvent::EndTest))
        );
        assert_eq!(parse_command("/start x", None, MessageId(1)), None);
        assert_eq!(parse_command("/unknown", None, MessageId(1)), Some(ConsoleCommand::Help));
    }
}
