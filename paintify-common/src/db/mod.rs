//! Database models and queries

pub mod images;
pub mod init;
pub mod models;
pub mod users;

pub use images::*;
pub use init::*;
pub use models::*;
pub use users::*;
