// Public API - what other modules can use
pub use handlers::{create_user, fetch_user, login, remove_user, update_user};
pub use service::UserService;

// Internal modules
mod handlers;
pub mod models;
mod password;
pub mod repository;
pub mod service;
