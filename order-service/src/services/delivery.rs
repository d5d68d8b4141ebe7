//! Document rendering and email delivery for committed orders.
//!
//! Delivery only reads the order. A failed render or send never changes it.

use crate::error::OrderError;
use crate::models::{DocumentKind, OrderLine, ResolvedOrder};
use crate::services::email::{EmailError, EmailTransport, OutgoingEmail};
use crate::services::metrics::record_email;
use crate::services::orders::OrderService;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tracing::{instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("No recipient address for customer {0}")]
    MissingRecipient(Uuid),

    #[error("No proforma issued for order {0}")]
    ProformaNotIssued(Uuid),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Order(e) => e.into(),
            DeliveryError::MissingRecipient(_) => AppError::BadRequest(anyhow::Error::new(err)),
            DeliveryError::ProformaNotIssued(_) => AppError::NotFound(anyhow::Error::new(err)),
            DeliveryError::Email(e) => AppError::EmailError(e.to_string()),
            DeliveryError::Render(_) => AppError::InternalError(anyhow::Error::new(err)),
        }
    }
}

/// Opaque artifact with a suggested filename.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

pub trait DocumentRenderer: Send + Sync {
    fn render(
        &self,
        order: &ResolvedOrder,
        kind: DocumentKind,
    ) -> Result<RenderedDocument, DeliveryError>;
}

/// Two decimals, half away from zero. Presentation only.
pub fn format_amount(value: Decimal) -> String {
    format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

fn document_title(order: &ResolvedOrder, kind: DocumentKind) -> Result<String, DeliveryError> {
    match kind {
        DocumentKind::Order => Ok(format!("Conferma ordine {}", order.order.number)),
        DocumentKind::Proforma => order
            .proforma
            .as_ref()
            .map(|p| format!("Proforma {}", p.number))
            .ok_or(DeliveryError::ProformaNotIssued(order.order.order_id)),
    }
}

/// Plain text order confirmation or proforma summary.
pub struct SummaryRenderer {
    agency_name: String,
}

impl SummaryRenderer {
    pub fn new(agency_name: impl Into<String>) -> Self {
        Self {
            agency_name: agency_name.into(),
        }
    }

    fn write_line(out: &mut String, line: &OrderLine) -> std::fmt::Result {
        writeln!(
            out,
            "{:>3}  {:<12} {:<30} {:>4} {:>4} {:>6} {:>10} {:>6} {:>10} {:>12}",
            line.position,
            line.product_code,
            line.product_name,
            line.cartons,
            line.loose_units,
            line.total_units,
            format_amount(line.unit_price),
            format_amount(line.discount_percent),
            format_amount(line.final_unit_price),
            format_amount(line.line_amount),
        )
    }

    fn write_document(
        &self,
        out: &mut String,
        resolved: &ResolvedOrder,
        title: &str,
        kind: DocumentKind,
    ) -> std::fmt::Result {
        let order = &resolved.order;
        let company = &resolved.company;
        let customer = &resolved.customer;

        writeln!(out, "{}", self.agency_name)?;
        writeln!(out, "{}", title)?;
        match (kind, resolved.proforma.as_ref()) {
            (DocumentKind::Proforma, Some(proforma)) => {
                writeln!(out, "Data: {}", proforma.issue_date.format("%d/%m/%Y"))?;
                writeln!(
                    out,
                    "Ordine: {} del {}",
                    order.number,
                    order.order_date.format("%d/%m/%Y")
                )?;
            }
            _ => writeln!(out, "Data: {}", order.order_date.format("%d/%m/%Y"))?,
        }
        writeln!(out)?;

        writeln!(out, "Fornitore: {}", company.display_name)?;
        if let Some(legal_name) = &company.legal_name {
            writeln!(out, "  {}", legal_name)?;
        }
        if let Some(vat) = &company.vat_number {
            writeln!(out, "  P.IVA {}", vat)?;
        }

        writeln!(out, "Cliente: {}", customer.legal_name)?;
        if let Some(address) = &customer.address {
            writeln!(out, "  {}", address)?;
        }
        if let Some(city) = &customer.city {
            match &customer.province {
                Some(province) => writeln!(out, "  {} ({})", city, province)?,
                None => writeln!(out, "  {}", city)?,
            }
        }
        if let Some(vat) = &customer.vat_number {
            writeln!(out, "  P.IVA {}", vat)?;
        }

        if let Some(address) = &order.delivery_address {
            let city = order.delivery_city.as_deref().unwrap_or_default();
            writeln!(out, "Destinazione: {} {}", address, city)?;
        }
        if let Some(delivery_type) = &order.delivery_type {
            writeln!(out, "Consegna: {}", delivery_type)?;
        }
        if let Some(payment) = &order.payment_terms {
            writeln!(out, "Pagamento: {}", payment)?;
        }
        writeln!(out)?;

        writeln!(
            out,
            "{:>3}  {:<12} {:<30} {:>4} {:>4} {:>6} {:>10} {:>6} {:>10} {:>12}",
            "#", "Codice", "Prodotto", "Cart", "Pz", "Tot", "Prezzo", "Sc%", "Netto", "Importo"
        )?;
        for line in &resolved.lines {
            Self::write_line(out, line)?;
        }
        writeln!(out)?;

        writeln!(out, "Totale pezzi: {}", order.total_units)?;
        writeln!(out, "Totale cartoni: {}", order.total_cartons)?;
        writeln!(out, "Imponibile: {}", format_amount(order.subtotal))?;
        if !order.closing_discount_percent.is_zero() {
            writeln!(
                out,
                "Sconto chiusura: {}%",
                format_amount(order.closing_discount_percent)
            )?;
        }
        writeln!(out, "Totale: {}", format_amount(order.final_total))?;
        writeln!(out, "Importi IVA esclusa.")?;

        if let Some(note) = &order.note {
            writeln!(out)?;
            writeln!(out, "Note: {}", note)?;
        }

        Ok(())
    }
}

impl DocumentRenderer for SummaryRenderer {
    fn render(
        &self,
        order: &ResolvedOrder,
        kind: DocumentKind,
    ) -> Result<RenderedDocument, DeliveryError> {
        let title = document_title(order, kind)?;

        let mut out = String::new();
        self.write_document(&mut out, order, &title, kind)
            .map_err(|e| DeliveryError::Render(e.to_string()))?;

        let filename = format!("{}.txt", title.replace(' ', "_"));

        Ok(RenderedDocument {
            bytes: out.into_bytes(),
            filename,
            mime_type: "text/plain; charset=utf-8".to_string(),
        })
    }
}

/// Optional overrides for a document email.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailRequest {
    /// Defaults to the customer's address.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub order_id: Uuid,
    pub kind: DocumentKind,
    pub recipient: String,
    pub filename: String,
    pub message_id: Option<String>,
}

pub struct DocumentDispatch {
    orders: Arc<OrderService>,
    renderer: Arc<dyn DocumentRenderer>,
    transport: Arc<dyn EmailTransport>,
}

impl DocumentDispatch {
    pub fn new(
        orders: Arc<OrderService>,
        renderer: Arc<dyn DocumentRenderer>,
        transport: Arc<dyn EmailTransport>,
    ) -> Self {
        Self {
            orders,
            renderer,
            transport,
        }
    }

    /// Render the committed order (or its proforma) and email it.
    #[instrument(skip(self, request), fields(order_id = %order_id, kind = kind.as_str()))]
    pub async fn send_order_document(
        &self,
        order_id: Uuid,
        kind: DocumentKind,
        request: EmailRequest,
    ) -> Result<DeliveryReport, DeliveryError> {
        let resolved = self.orders.get_order(order_id).await?;

        let recipient = request
            .to
            .clone()
            .or_else(|| resolved.customer.email.clone())
            .filter(|s| !s.trim().is_empty())
            .ok_or(DeliveryError::MissingRecipient(resolved.customer.customer_id))?;

        let document = self.renderer.render(&resolved, kind)?;
        let title = document_title(&resolved, kind)?;

        let email = OutgoingEmail {
            to: recipient.clone(),
            cc: request.cc,
            bcc: request.bcc,
            subject: request.subject.unwrap_or_else(|| title.clone()),
            body: request.body.unwrap_or_else(|| {
                format!(
                    "Gentile {},\n\nin allegato {} del {}.\n\nCordiali saluti\n{}",
                    resolved.customer.legal_name,
                    title,
                    resolved.order.order_date.format("%d/%m/%Y"),
                    resolved.company.display_name
                )
            }),
            attachment: document.bytes,
            filename: document.filename.clone(),
            mime_type: document.mime_type,
        };

        match self.transport.send(&email).await {
            Ok(message_id) => {
                record_email(kind.as_str(), "sent");
                Ok(DeliveryReport {
                    order_id,
                    kind,
                    recipient,
                    filename: document.filename,
                    message_id,
                })
            }
            Err(e) => {
                warn!(error = %e, recipient = %recipient, "Document email failed");
                record_email(kind.as_str(), "failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_amounts_round_half_away_from_zero() {
        assert_eq!(format_amount(Decimal::from_str("135").unwrap()), "135.00");
        assert_eq!(format_amount(Decimal::from_str("2.345").unwrap()), "2.35");
        assert_eq!(format_amount(Decimal::from_str("2.344999").unwrap()), "2.34");
        assert_eq!(format_amount(Decimal::from_str("0.125").unwrap()), "0.13");
    }
}
