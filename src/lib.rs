#![forbid(unsafe_code)]

pub mod budget;
pub mod canonical;
pub mod classify;
pub mod cli;
pub mod crawl;
pub mod extract;
pub mod fetch;
pub mod formats;
pub mod frontier;
pub mod jsroutes;
pub mod logging;
pub mod registry;
pub mod scope;
pub mod score;
