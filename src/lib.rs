pub mod catalog;
pub mod config;
pub mod device;
pub mod error;
pub mod google;
pub mod index;
pub mod media;
pub mod orchestrator;
pub mod pipeline;
pub mod processing;
pub mod tasks {
    pub mod loader;
    pub mod scheduler;
}
