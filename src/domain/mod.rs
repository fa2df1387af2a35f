pub mod account;
pub mod clock;
pub mod sensors;
