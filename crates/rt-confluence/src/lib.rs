//! Confluence integration for roundtripper.
//!
//! - [`ConfluenceClient`]: REST API client with PAT or basic authentication
//! - [`ContentStore`]: the remote operations sync code depends on
//! - [`MockContentStore`]: in-memory store for tests (feature `mock`)
//!
//! # API Client
//!
//! ```ignore
//! use rt_config::Config;
//! use rt_confluence::{ConfluenceClient, ContentStore};
//!
//! let config = Config::load(None, None)?;
//! let client = ConfluenceClient::from_config(&config.confluence, &config.connection)?;
//!
//! let page = client.get_page("123")?;
//! println!("Page title: {}", page.title);
//! ```

mod client;
pub use client::ConfluenceClient;

mod error;
pub use error::ConfluenceError;

mod store;
pub use store::ContentStore;

pub mod types;

#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockContentStore, RecordedUpdate};
