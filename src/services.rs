pub mod import_service;
pub mod lead_service;

pub use import_service::ImportService;
pub use lead_service::LeadService;
