//! HTTP API handlers

pub mod gallery;
pub mod health;
pub mod paintify;
pub mod session;

pub use gallery::{list_images, remove_image};
pub use health::health_routes;
pub use paintify::submit;
pub use session::{login, logout, signup};
