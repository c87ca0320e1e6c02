pub mod config;
pub mod credentials;
pub mod selection;
pub mod sync;
