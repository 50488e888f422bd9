//! 聊天传输接口 - 基础设施层
//!
//! 流程层只通过这个接口与聊天平台交互：展示题目、发送提示、删除消息

use async_trait::async_trait;

use crate::error::ChatError;
use crate::models::ids::{MessageId, UserId};
use crate::models::render::RenderRequest;

/// 聊天传输接口
///
/// 职责：
/// - 把 `RenderRequest` 展示给用户，返回产生的全部消息 ID
/// - 发送普通提示消息
/// - 删除消息（临时消息清理、丢弃无关输入）
/// - 不认识测试和答案
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// 展示题目，返回本次发送的消息（包括插图）
    async fn render(&self, user_id: UserId, request: &RenderRequest) -> Result<Vec<MessageId>, ChatError>;

    /// 发送提示消息
    async fn notify(&self, user_id: UserId, text: &str) -> Result<MessageId, ChatError>;

    /// 删除消息
    async fn delete(&self, user_id: UserId, message_id: MessageId) -> Result<(), ChatError>;
}
