pub mod chat_port;
pub mod console_chat;

pub use chat_port::ChatPort;
pub use console_chat::ConsoleChat;
