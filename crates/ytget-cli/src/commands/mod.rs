pub mod batch;
pub mod config;
pub mod doctor;
pub mod formats;
pub mod get;
