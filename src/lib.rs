pub mod config;
pub mod db;
pub mod filter;
pub mod logging;
pub mod matcher;
