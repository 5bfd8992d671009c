//! 1Password CLI retriever.
//!
//! This retriever reads the IAM key pair from a 1Password item via the `op`
//! command-line tool. It requires the 1Password CLI to be installed and signed
//! in (desktop app integration or `op signin`); authentication is left
//! entirely to `op`.
//!
//! # Invocation
//!
//! ```text
//! op item get <item> --vault <vault> --fields label=<akid>,label=<secret> --format json
//! ```
//!
//! # Example
//!
//! ```
//! use op_aws_credential_helper::backends::onepassword::OnePasswordRetriever;
//!
//! let retriever = OnePasswordRetriever::new("/usr/local/bin/op");
//! assert_eq!(retriever.cli_path(), "/usr/local/bin/op");
//! ```

mod backend;

pub use backend::{extract_secret, OnePasswordRetriever};
