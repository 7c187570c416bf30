//! Google API clients module

pub mod oauth;
pub mod search_console;
pub mod types;

pub use oauth::OAuthClient;
pub use search_console::{SearchConsole, SearchConsoleClient};
