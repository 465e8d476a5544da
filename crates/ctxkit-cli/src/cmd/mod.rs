pub mod bundle;
pub mod check;
pub mod config;
pub mod init;
