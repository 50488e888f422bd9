//! 终端聊天传输 - 基础设施层
//!
//! 把渲染结果打印到标准输出，用于本地试运行

use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::debug;

use crate::error::ChatError;
use crate::infrastructure::chat_port::ChatPort;
use crate::models::ids::{MessageId, UserId};
use crate::models::render::RenderRequest;

pub struct ConsoleChat {
    next_message_id: AtomicI32,
}

impl ConsoleChat {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicI32::new(1),
        }
    }

    /// 分配一个消息 ID（发出的消息和用户输入共用同一序列）
    pub fn next_message_id(&self) -> MessageId {
        MessageId(self.next_message_id.fetch_add(1, Ordering::Relaxed))
    }

    fn print(&self, user_id: UserId, text: &str) -> Result<MessageId, ChatError> {
        let id = self.next_message_id();
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "[{} → 用户 {}] {}", id, user_id, text)
            .and_then(|_| stdout.flush())
            .map_err(|e| ChatError::SendFailed {
                reason: e.to_string(),
            })?;
        Ok(id)
    }
}

impl Default for ConsoleChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatPort for ConsoleChat {
    async fn render(&self, user_id: UserId, request: &RenderRequest) -> Result<Vec<MessageId>, ChatError> {
        let mut ids = Vec::new();
        if let Some(media) = &request.media {
            ids.push(self.print(user_id, &format!("🖼️ {}", media))?);
        }
        ids.push(self.print(user_id, &format!("\n{}", request.text))?);
        Ok(ids)
    }

    async fn notify(&self, user_id: UserId, text: &str) -> Result<MessageId, ChatError> {
        self.print(user_id, text)
    }

    async fn delete(&self, user_id: UserId, message_id: MessageId) -> Result<(), ChatError> {
        debug!("删除消息 {} (用户 {})", message_id, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_render_returns_one_id_per_message() {
        let chat = ConsoleChat::new();
        let request = RenderRequest {
            text: "Кто?".to_string(),
            media: Some("https://example.com/a.png".to_string()),
            options: Vec::new(),
            expects_freeform: true,
        };
        let ids = chat.render(UserId(1), &request).await.unwrap();
        assert_eq!(ids, vec![MessageId(1), MessageId(2)]);
        assert_eq!(chat.notify(UserId(1), "ok").await.unwrap(), MessageId(3));
    }
}
