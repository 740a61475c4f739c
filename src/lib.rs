pub mod app;
pub mod domain;
pub mod error;
pub mod gitea;
pub mod lock;
pub mod output;
pub mod store;
