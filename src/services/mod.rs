pub mod answer_store;
pub mod failure_log;
pub mod navigation_store;
pub mod question_kinds;
pub mod schema_translator;
pub mod test_catalog;

pub use answer_store::{AnswerStore, InMemoryAnswerStore};
pub use failure_log::FailureLog;
pub use navigation_store::{InMemoryNavigationStore, NavigationStore};
pub use question_kinds::{AnswerUpdate, SubmissionPair, UserInput};
pub use schema_translator::SchemaTranslator;
pub use test_catalog::{InMemoryTestCatalog, TestCatalog};
