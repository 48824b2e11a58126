pub mod intake;
pub mod pending;
pub mod records;
