pub mod config_history;

#[cfg(feature = "aws")]
pub mod aws;
