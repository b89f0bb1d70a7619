// Public API - what other modules can use
pub use handlers::{
    delete_replay, get_replay, list_pending_replays, list_replays, update_replay, upload_replay,
};
pub use service::ReplayService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;
