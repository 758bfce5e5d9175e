pub mod account;
pub mod import;
pub mod lead;
