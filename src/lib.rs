pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod logs;
pub mod model;
pub mod poll;
pub mod remote;
pub mod session;
pub mod store;
