// Public API - what other modules can use
pub use handlers::{
    create_student, delete_student, get_student, list_birthdays, list_students, update_student,
};
pub use service::StudentService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
