pub mod check;
pub mod permissions;
