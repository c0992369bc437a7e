pub mod clock;
pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;

pub use clock::{Clock, FixedClock, SystemClock};
pub use cpq::catalog::{CatalogCategory, CatalogDefinition};
pub use cpq::pricing::{DeterministicPricingEngine, PricingEngine, PricingInput, PricingResult};
pub use domain::client::ClientInfo;
pub use domain::machine::{Machine, MachineCode};
pub use domain::quotation::{
    NewQuotation, Quotation, QuotationId, QuotationRequest, QuotationStats,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
