pub mod answer;
pub mod descriptor;
pub mod form;
pub mod ids;
pub mod loaders;
pub mod navigation;
pub mod render;

pub use answer::{Answer, AnswerPayload};
pub use descriptor::{QuestionDescriptor, QuestionKind};
pub use form::RawForm;
pub use ids::{MessageId, OptionIndex, QuestionId, TestId, UserId};
pub use loaders::{load_all_form_files, load_form_json, load_toml, FormFile};
pub use navigation::{NavPhase, NavigationState};
pub use quiz_test::{QuizTest, StoredQuestion};
pub use render::{RenderRequest, RenderedOption};
