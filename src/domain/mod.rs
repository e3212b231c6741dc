pub mod country;
pub mod like;
pub mod stats;
pub mod user;
pub mod vacation;
