// Public API - what other modules can use
pub use cached::CachedUserRepository;
pub use handlers::{
    create_user, delete_user, get_user, get_user_by_riot_id, get_user_with_replays, list_users,
    update_user,
};
pub use service::UserService;

// Internal modules
pub mod cached;
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;
