//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责事件调度和应用组装，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `dispatcher` - 事件调度器
//! - 同一用户的事件串行处理（每个用户一把异步锁）
//! - 不同用户并发处理（Semaphore 限制并发数量）
//! - 批量处理并输出统计
//!
//! ### `app` - 应用入口
//! - 校验配置，组装存储、提交客户端、聊天传输
//! - 启动时导入表单
//! - 终端会话
//!
//! ## 层次关系
//!
//! ```text
//! app (组装资源，读取输入)
//!     ↓
//! dispatcher (按用户串行，跨用户并发)
//!     ↓
//! workflow::QuizFlow (处理单个事件)
//!     ↓
//! services (能力层：translator / kinds / stores / catalog)
//!     ↓
//! clients / infrastructure (提交客户端、聊天传输)
//! ```

pub mod app;
pub mod dispatcher;

pub use app::{parse_command, App, ConsoleCommand};
pub use dispatcher::{BatchReport, Dispatcher};
