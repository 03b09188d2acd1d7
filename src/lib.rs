pub mod config;
pub mod engine;
pub mod llm_client;
pub mod orchestrator;
pub mod persona;
pub mod profile;
pub mod server;
pub mod sessions;
pub mod store;
