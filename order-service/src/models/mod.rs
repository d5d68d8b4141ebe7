//! Domain models for order-service.

mod anagraphic;
mod document;
mod order;
mod preference;

pub use anagraphic::{
    Customer, Product, SaveCompany, SaveCustomer, SaveProduct, SupplierCompany, CARTON_SIZE,
};
pub use document::{DocumentKind, ProformaDocument, ResolvedOrder};
pub use order::{
    CartEntry, DeliveryAddress, ListOrdersFilter, Order, OrderDraft, OrderLine, OrderStatus,
};
pub use preference::PreferenceRecord;
