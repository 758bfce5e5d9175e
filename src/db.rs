pub mod account_repo;
pub use account_repo::{AccountRepository, AccountStore};
pub mod lead_repo;
pub use lead_repo::{LeadRepository, LeadStore};
