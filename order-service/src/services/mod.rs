pub mod delivery;
pub mod email;
pub mod metrics;
pub mod orders;
pub mod preferences;

pub use delivery::{
    DeliveryError, DeliveryReport, DocumentDispatch, DocumentRenderer, EmailRequest,
    RenderedDocument, SummaryRenderer,
};
pub use email::{EmailError, EmailTransport, MockEmailTransport, OutgoingEmail, SmtpEmailTransport};
pub use metrics::{get_metrics, init_metrics};
pub use orders::{OrderService, SavedOrder};
pub use preferences::PreferenceMemory;
