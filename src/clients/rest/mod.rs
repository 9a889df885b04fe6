//! The REST client and its verb surface.
//!
//! # Overview
//!
//! - [`RestClient`]: the long-lived client with `get()`, `post()`, `put()`,
//!   `delete()` and `list()` methods
//! - [`RestInterface`]: the same verb surface as a trait, for code that should
//!   not depend on the concrete client
//!
//! # Example
//!
//! ```rust,ignore
//! use harbor_rest::{ClientConfig, RestClient, RestInterface};
//!
//! async fn project_count(api: &dyn RestInterface) -> Result<usize, harbor_rest::RestError> {
//!     let projects: Vec<serde_json::Value> = api.list().path("projects").execute().await?;
//!     Ok(projects.len())
//! }
//!
//! let client = RestClient::new(
//!     ClientConfig::builder()
//!         .base_url("https://harbor.example.com")
//!         .api_path("/api/v2.0")
//!         .build()?,
//! )?;
//! println!("{} projects", project_count(&client).await?);
//! ```

mod client;

pub use client::{RestClient, RestInterface};
pub(crate) use client::ClientState;
