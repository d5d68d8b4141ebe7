//! Sequential `PREFIX-YEAR-NNNN` document numbers, scoped per company, year and kind.

use crate::models::{DocumentKind, SupplierCompany};
use crate::store::{StoreError, StoreTransaction};
use std::fmt;
use tracing::debug;

/// Prefix used when the company name has no alphanumeric characters.
pub const FALLBACK_PREFIX: &str = "AZ";

const PREFIX_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNumber {
    pub prefix: String,
    pub year: i32,
    pub sequence: i32,
}

impl DocumentNumber {
    /// The `PREFIX-YEAR-` part shared by every number in one sequence.
    pub fn scope(prefix: &str, year: i32) -> String {
        format!("{}-{:04}-", prefix, year)
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:04}",
            Self::scope(&self.prefix, self.year),
            self.sequence
        )
    }
}

/// First three characters of the uppercased alphanumeric display name.
///
/// Uppercasing happens before truncation since some characters expand
/// (`ß` becomes `SS`).
pub fn company_prefix(display_name: &str) -> String {
    let prefix: String = display_name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .take(PREFIX_LEN)
        .collect();

    if prefix.is_empty() {
        FALLBACK_PREFIX.to_string()
    } else {
        prefix
    }
}

pub struct SequentialDocumentNumberer;

impl SequentialDocumentNumberer {
    /// Next unused number for the company/year/kind scope.
    ///
    /// The sequence is keyed by company id rather than prefix, so renaming a
    /// company continues its numbering under the new prefix.
    ///
    /// Must run inside the transaction that inserts the numbered row; the
    /// storage unique constraint catches concurrent writers that read the same
    /// maximum.
    pub async fn next(
        tx: &mut dyn StoreTransaction,
        kind: DocumentKind,
        company: &SupplierCompany,
        year: i32,
    ) -> Result<DocumentNumber, StoreError> {
        let prefix = company_prefix(&company.display_name);
        let scope = DocumentNumber::scope(&prefix, year);

        let highest = tx
            .highest_sequence(kind, company.company_id, year)
            .await?;
        let sequence = highest.map_or(1, |h| h + 1);

        debug!(
            kind = kind.as_str(),
            company_id = %company.company_id,
            scope = %scope,
            sequence,
            "Document number computed"
        );

        Ok(DocumentNumber {
            prefix,
            year,
            sequence,
        })
    }
}
