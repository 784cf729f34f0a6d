pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod history;
pub mod model;
pub mod output;
pub mod scoring;
pub mod sources;
