//! Command implementations, one file per subcommand.

pub mod add;
#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod completions;
pub mod delete;
pub mod edit;
pub mod fill;
pub mod forget;
pub mod get;
pub mod list;
pub mod match_cmd;
pub mod passwd;
pub mod register;
pub mod serve;
pub mod status;
pub mod version;
