pub mod navigation;
pub mod quiz_flow;
pub mod user_ctx;

pub use navigation::{transition, NavStep};
pub use quiz_flow::{FlowOutcome, QuizEvent, QuizFlow};
pub use user_ctx::UserCtx;
