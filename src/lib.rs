pub mod client;
pub mod config;
pub mod dataset;
pub mod logging;
pub mod promise;
pub mod series;
