//! # Form Quiz Bridge
//!
//! 把第三方表单导入为聊天测验，收集用户答案，再通过表单的公开提交地址回填答案
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 聊天传输接口 `ChatPort`，以及终端实现 `ConsoleChat`
//! - `clients/` - `FormResponseClient`，拼接提交链接并识别返回页面
//!
//! ### ② 业务能力层（Services）
//! - `SchemaTranslator` - 表单题目树 → 题目描述，全部成功或全部失败
//! - `question_kinds` - 三种题目类型的展示、校验、记录、编码
//! - `AnswerStore` / `NavigationStore` / `TestCatalog` - 存储
//! - `FailureLog` - 写提交失败记录
//!
//! ### ③ 流程层（Workflow）
//! - `navigation::transition` - 唯一的导航状态转换函数
//! - `QuizFlow` - 处理一个用户的一个事件
//! - `UserCtx` - 日志上下文
//!
//! ### ④ 编排层（Orchestration）
//! - `Dispatcher` - 按用户串行，跨用户并发
//! - `App` - 组装资源，终端会话
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::FormResponseClient;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::ChatPort;
pub use models::{QuestionDescriptor, QuestionKind, QuizTest};
pub use orchestrator::{App, Dispatcher};
pub use services::SchemaTranslator;
pub use workflow::{FlowOutcome, QuizEvent, QuizFlow};
