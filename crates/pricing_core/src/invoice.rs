//! Invoice line factory: deep-copies `QuoteLine`s into frozen `InvoiceLine`s
//! and totals an invoice (spec §4.14).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::TripType;
use crate::money::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteLineType {
    OptionalFee,
    Promotion,
    Manual,
    Calculated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceLineType {
    OptionalFee,
    PromotionAdjustment,
    Other,
    Transport,
}

impl From<QuoteLineType> for InvoiceLineType {
    fn from(value: QuoteLineType) -> Self {
        match value {
            QuoteLineType::OptionalFee => InvoiceLineType::OptionalFee,
            QuoteLineType::Promotion => InvoiceLineType::PromotionAdjustment,
            QuoteLineType::Manual => InvoiceLineType::Other,
            QuoteLineType::Calculated => InvoiceLineType::Transport,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLine {
    pub id: String,
    pub line_type: QuoteLineType,
    pub description: String,
    pub total_excl_vat: Decimal,
    pub vat_rate: Decimal,
    pub pickup_at: Option<NaiveDate>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub quote_line_id: String,
    pub line_type: InvoiceLineType,
    pub description: String,
    pub total_excl_vat: Decimal,
    pub vat_rate: Decimal,
    pub total_vat: Decimal,
}

fn trip_type_label(trip_type: TripType) -> &'static str {
    match trip_type {
        TripType::Transfer => "TRANSFER",
        TripType::Dispo => "Mise à disposition",
        TripType::Excursion => "EXCURSION",
        TripType::Stay => "Séjour",
    }
}

/// Build the enriched multi-line description for a `CALCULATED` line; other
/// line types keep their original description (spec §4.14).
fn enrich_description(line: &QuoteLine, trip_type: Option<TripType>, is_first_line: bool, end_customer_name: Option<&str>) -> String {
    let mut parts = Vec::new();
    if is_first_line {
        if let Some(name) = end_customer_name {
            parts.push(format!("Client: {name}"));
        }
    }
    parts.push(line.description.clone());

    if line.line_type == QuoteLineType::Calculated {
        if let Some(trip_type) = trip_type {
            parts.push(trip_type_label(trip_type).to_string());
        }
        if let Some(date) = line.pickup_at {
            parts.push(date.format("%d/%m/%Y").to_string());
        }
        if let Some(pickup) = &line.pickup_address {
            parts.push(pickup.clone());
        }
        if let Some(dropoff) = &line.dropoff_address {
            parts.push(dropoff.clone());
        }
    }

    parts.join("\n")
}

pub fn build_invoice_line(
    line: &QuoteLine,
    trip_type: Option<TripType>,
    is_first_line: bool,
    end_customer_name: Option<&str>,
) -> InvoiceLine {
    let total_vat = round2(line.total_excl_vat * line.vat_rate / Decimal::from(100));
    InvoiceLine {
        quote_line_id: line.id.clone(),
        line_type: line.line_type.into(),
        description: enrich_description(line, trip_type, is_first_line, end_customer_name),
        total_excl_vat: line.total_excl_vat,
        vat_rate: line.vat_rate,
        total_vat,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub reference: String,
    pub lines: Vec<InvoiceLine>,
    pub total_excl_vat: Decimal,
    pub total_vat: Decimal,
    pub total_incl_vat: Decimal,
    pub issued_at: DateTime<Utc>,
    pub due_date: NaiveDate,
}

pub fn totals(lines: &[InvoiceLine]) -> (Decimal, Decimal, Decimal) {
    let total_excl_vat = round2(lines.iter().map(|l| l.total_excl_vat).sum());
    let total_vat = round2(lines.iter().map(|l| l.total_vat).sum());
    (total_excl_vat, total_vat, round2(total_excl_vat + total_vat))
}

/// `today + paymentTermsDays` (partner contract terms if set, else 30 days).
pub fn compute_due_date(issued_at: NaiveDate, payment_terms_days: Option<i64>) -> NaiveDate {
    issued_at + chrono::Duration::days(payment_terms_days.unwrap_or(30))
}

/// `INV-YYYY-NNNN` monotonically increasing per (org, year); like
/// `quote::generate_order_reference`, the existence check is supplied by the
/// caller's repository.
pub fn generate_invoice_reference(year: i32, next_sequence: u32) -> String {
    format!("INV-{year}-{next_sequence:04}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn calculated_line() -> QuoteLine {
        QuoteLine {
            id: "ql1".into(),
            line_type: QuoteLineType::Calculated,
            description: "Transfer CDG -> Paris".into(),
            total_excl_vat: dec!(100),
            vat_rate: dec!(10),
            pickup_at: NaiveDate::from_ymd_opt(2024, 6, 1),
            pickup_address: Some("CDG Terminal 2".into()),
            dropoff_address: Some("Champs-Elysées".into()),
        }
    }

    #[test]
    fn deep_copy_is_independent_of_source_line() {
        let mut line = calculated_line();
        let invoice_line = build_invoice_line(&line, Some(TripType::Transfer), true, Some("Acme Corp"));
        line.total_excl_vat = dec!(999);
        assert_eq!(invoice_line.total_excl_vat, dec!(100));
    }

    #[test]
    fn vat_is_recomputed_from_rate() {
        let line = calculated_line();
        let invoice_line = build_invoice_line(&line, Some(TripType::Transfer), false, None);
        assert_eq!(invoice_line.total_vat, dec!(10.00));
    }

    #[test]
    fn first_line_includes_client_name() {
        let line = calculated_line();
        let invoice_line = build_invoice_line(&line, Some(TripType::Transfer), true, Some("Acme Corp"));
        assert!(invoice_line.description.starts_with("Client: Acme Corp"));
    }

    #[test]
    fn line_type_mapping_matches_spec() {
        assert_eq!(InvoiceLineType::from(QuoteLineType::OptionalFee), InvoiceLineType::OptionalFee);
        assert_eq!(InvoiceLineType::from(QuoteLineType::Promotion), InvoiceLineType::PromotionAdjustment);
        assert_eq!(InvoiceLineType::from(QuoteLineType::Manual), InvoiceLineType::Other);
        assert_eq!(InvoiceLineType::from(QuoteLineType::Calculated), InvoiceLineType::Transport);
    }

    #[test]
    fn due_date_defaults_to_30_days() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(compute_due_date(today, None), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }
}
