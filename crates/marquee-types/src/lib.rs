pub mod config;
pub mod patch;
pub mod runtime;
pub mod validator;

pub use patch::Patch;
pub use runtime::Runtime;
pub use validator::{ValidationErrors, Validator};
