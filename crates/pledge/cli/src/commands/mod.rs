//! CLI command implementations

pub mod cloud;
pub mod genesis;
pub mod init;
pub mod query;
pub mod record;
