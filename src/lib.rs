//! # conversion-gateway
//!
//! An HTTP service that converts uploaded images and PDFs and serves the
//! results back as static files.
//!
//! ## Request Lifecycle
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Auth      optional X-Api-Key check, before the body is read
//!  ├─ 2. Ingest    buffer multipart uploads in memory
//!  ├─ 3. Params    range/enum checks (quality, target_format)
//!  ├─ 4. Validate  decode as image (image crate) or PDF (lopdf)
//!  ├─ 5. Convert   pack / reformat / compress / rasterise / merge / split
//!  ├─ 6. Persist   write under <prefix>_<uuid-hex>.<ext>
//!  └─ 7. Reference /outputs/<name> in a JSON body
//! ```
//!
//! Steps 4 and 5 run on the blocking pool; the rest is async.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conversion_gateway::{build_router, Gateway, GatewayConfig, LocalDirStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::builder().output_dir("outputs").build()?;
//!     let store = LocalDirStore::new(&config.output_dir);
//!     store.ensure().await?;
//!
//!     let app = build_router(Arc::new(Gateway::new(config, Arc::new(store))));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `conversion-gateway` binary (clap + anyhow + tracing-subscriber + dotenv) |
//!
//! ## Native Dependency
//!
//! Only `POST /convert/pdf-to-images` needs libpdfium at runtime. Point
//! [`GatewayConfig::pdfium_library`] at the library (or its directory), or
//! leave it unset to use the system loader path. Every other operation is
//! pure Rust.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod auth;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{Artifact, ArtifactName, OUTPUTS_MOUNT};
pub use auth::{ApiKeyGuard, API_KEY_HEADER};
pub use config::{GatewayConfig, GatewayConfigBuilder};
pub use convert::Gateway;
pub use error::{GatewayError, StoreError};
pub use output::{ArtifactListResponse, CleanupResponse, HealthResponse, SingleArtifactResponse};
pub use server::{bind_listener, build_router, shutdown_signal};
pub use store::{ArtifactStore, LocalDirStore, MemoryStore, StoreEntry};
