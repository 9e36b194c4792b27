pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod import;
pub mod parse;
pub mod rollup;
pub mod source;
