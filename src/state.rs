//! Application state management

use crate::config::Config;
use crate::google::{OAuthClient, SearchConsole, SearchConsoleClient};
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// Session state lives in cookies and job state is request-local, so
/// there is nothing mutable here.
pub struct AppState {
    pub config: Config,
    pub oauth: OAuthClient,
    pub search_console: Arc<dyn SearchConsole>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            oauth: OAuthClient::new(),
            search_console: Arc::new(SearchConsoleClient::new()),
        }
    }
}
