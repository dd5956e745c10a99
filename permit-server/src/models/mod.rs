pub mod check;
pub mod user;
