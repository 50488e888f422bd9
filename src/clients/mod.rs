pub mod form_client;

pub use form_client::{classify_response, extract_form_id, EncodedAnswers, FormResponseClient};
