pub mod leads;
pub mod webhooks;
