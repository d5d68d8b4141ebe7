//! Pure order composition rules: pricing, totals, numbering, status machine.

pub mod numbering;
pub mod pricing;
pub mod status;
pub mod totals;

pub use numbering::{company_prefix, DocumentNumber, SequentialDocumentNumberer};
pub use pricing::{CartLineCalculator, PricedLine};
pub use status::{apply_transition, StatusAction};
pub use totals::OrderTotals;
