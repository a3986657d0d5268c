#![forbid(unsafe_code)]

pub mod assemble;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod formats;
pub mod harvest;
pub mod item;
pub mod logging;
pub mod mime;
pub mod pdf;
pub mod pdf_meta;
pub mod pipeline;
pub mod query;
pub mod search;
