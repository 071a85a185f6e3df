pub mod parser;
pub mod types;

pub use parser::{access_token_env_var, load_config};
pub use types::*;
