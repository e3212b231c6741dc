pub mod auth;
pub mod countries;
pub mod error;
pub mod likes;
pub mod passwords;
pub mod policy;
pub mod stats;
pub mod tokens;
pub mod users;
pub mod vacations;
