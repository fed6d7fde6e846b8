pub mod ai;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod food;
pub mod pagination;
pub mod planner;
pub mod state;

pub use app::build_app;
pub use state::AppState;
