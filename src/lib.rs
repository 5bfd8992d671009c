//! op-aws-credential-helper - AWS `credential_process` helper backed by 1Password.
//!
//! The AWS SDKs and CLI run this helper whenever a profile needs credentials.
//! It reuses a cached MFA session while one is valid and otherwise fetches the
//! long-lived IAM key from 1Password, asks for an MFA code on the terminal,
//! and exchanges both for a temporary session via STS `GetSessionToken`.
//!
//! # Features
//!
//! - **Per-profile cache**: sessions reused until five minutes before expiry
//! - **No secrets at rest**: the long-lived key never leaves memory
//! - **Async/Await**: built on tokio; Ctrl-C aborts any pending step
//! - **Swappable collaborators**: every external system sits behind a trait
//!
//! # Quick Start
//!
//! ```toml
//! [profile dev]
//! region = eu-west-1
//! mfa_serial = arn:aws:iam::111122223333:mfa/alice
//! credential_process = op-aws-credential-helper --profile dev --op-vault Private --op-item aws-dev
//! ```
//!
//! Library use mirrors the binary:
//!
//! ```no_run
//! use op_aws_credential_helper::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> op_aws_credential_helper::Result<()> {
//!     let config = Config::new("Private", "aws-dev").with_profile("dev");
//!     let pipeline = Pipeline::from_config(config)?;
//!
//!     let acquisition = pipeline.run().await?;
//!     println!("{}", acquisition.credential.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Default | Notes |
//! |---------|---------|-------|
//! | `mock` | yes | In-memory collaborators for testing |

pub mod backends;
pub mod cache;
pub mod cli;
pub mod command;
pub mod config;
pub mod credential;
pub mod error;
pub mod exchange;
pub mod pipeline;
pub mod profile;
pub mod prompt;
pub mod retriever;
pub mod validation;

pub use config::Config;
pub use credential::{LongLivedSecret, SessionCredential};
pub use error::{HelperError, Result};
pub use pipeline::{Acquisition, Origin, Pipeline};
