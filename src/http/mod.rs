//! HTTP server module
//!
//! Provides:
//! - Google OAuth sign-in flow (/api/auth/*)
//! - Search Console endpoints (/api/search-console/*), including the
//!   streaming keyword ranking job
//! - Health check (/health)

pub mod handlers;
pub mod server;
pub mod types;

pub use server::{router, serve};
