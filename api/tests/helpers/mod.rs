pub mod app;
pub mod auth;

pub use app::make_test_app;
pub use auth::generate_jwt;
