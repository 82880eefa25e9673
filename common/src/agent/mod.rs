pub mod prompt;
pub mod parser;
pub mod executor;
pub mod validator;

pub use executor::{generate_sql, refine_sql};
pub use parser::{extract_changes, extract_json_object, extract_sql};
pub use prompt::{build_generation_prompt, build_refinement_prompt, build_validation_prompt};
pub use validator::{LlmValidator, SqlValidator, ValidationVerdict};
