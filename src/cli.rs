//! Command-line interface.

use crate::config::{
    Config, DEFAULT_ACCESS_KEY_ID_FIELD, DEFAULT_OP_CLI_PATH, DEFAULT_PROFILE,
    DEFAULT_SECRET_ACCESS_KEY_FIELD,
};
use clap::{ArgAction, Parser};
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "op-aws-credential-helper",
    version,
    about = "AWS credential_process helper backed by 1Password and MFA",
    long_about = None
)]
pub struct Cli {
    #[arg(long, default_value = DEFAULT_PROFILE, help = "AWS profile name")]
    pub profile: String,

    #[arg(
        long,
        default_value = "12h",
        value_parser = humantime::parse_duration,
        help = "Session duration (e.g. 1h, 90m, 12h)"
    )]
    pub duration: Duration,

    #[arg(long = "op-vault", help = "1Password vault holding the IAM key")]
    pub op_vault: String,

    #[arg(long = "op-item", help = "1Password item holding the IAM key")]
    pub op_item: String,

    #[arg(
        long = "op-access-key-id-field",
        default_value = DEFAULT_ACCESS_KEY_ID_FIELD,
        help = "Label of the field holding the access key ID"
    )]
    pub op_access_key_id_field: String,

    #[arg(
        long = "op-secret-access-key-field",
        default_value = DEFAULT_SECRET_ACCESS_KEY_FIELD,
        help = "Label of the field holding the secret access key"
    )]
    pub op_secret_access_key_field: String,

    #[arg(
        long = "op-cli-path",
        default_value = DEFAULT_OP_CLI_PATH,
        help = "Path to the 1Password CLI"
    )]
    pub op_cli_path: String,

    #[arg(short = 'v', long, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,
}

impl Cli {
    /// Converts parsed arguments into a run configuration.
    pub fn into_config(self) -> Config {
        Config::new(self.op_vault, self.op_item)
            .with_profile(self.profile)
            .with_duration(self.duration)
            .with_fields(self.op_access_key_id_field, self.op_secret_access_key_field)
            .with_op_cli_path(self.op_cli_path)
            .with_version(env!("CARGO_PKG_VERSION"))
    }
}
