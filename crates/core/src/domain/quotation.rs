use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::pricing::PricingResult;
use crate::domain::client::ClientInfo;
use crate::domain::machine::MachineCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotationId(pub i64);

/// A request to quote one machine for one client, shared by every request surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotationRequest {
    pub machine_code: MachineCode,
    pub client: ClientInfo,
    pub discount_percent: Decimal,
}

/// A quotation that has been priced but not stored yet.
///
/// `machine_code` is a soft reference: the record outlives deactivation of the machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewQuotation {
    pub machine_code: MachineCode,
    pub client: ClientInfo,
    pub discount_applied: bool,
    pub discount_percent: Decimal,
    pub base_price: Decimal,
    pub final_price: Decimal,
}

impl NewQuotation {
    pub fn priced(request: &QuotationRequest, pricing: &PricingResult) -> Self {
        Self {
            machine_code: request.machine_code.clone(),
            client: request.client.clone(),
            discount_applied: pricing.discount_applied,
            discount_percent: pricing.discount_percent,
            base_price: pricing.base_price,
            final_price: pricing.final_price,
        }
    }

    pub fn into_record(self, id: QuotationId, created_at: DateTime<Utc>) -> Quotation {
        Quotation {
            id,
            machine_code: self.machine_code,
            client: self.client,
            discount_applied: self.discount_applied,
            discount_percent: self.discount_percent,
            base_price: self.base_price,
            final_price: self.final_price,
            created_at,
        }
    }
}

/// Stored, append-only quotation record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: QuotationId,
    pub machine_code: MachineCode,
    #[serde(flatten)]
    pub client: ClientInfo,
    pub discount_applied: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotationStats {
    pub total_quotations: u64,
    pub quotations_with_discount: u64,
    pub discount_percentage: f64,
}

impl QuotationStats {
    pub fn from_counts(total_quotations: u64, quotations_with_discount: u64) -> Self {
        let discount_percentage = if total_quotations == 0 {
            0.0
        } else {
            quotations_with_discount as f64 / total_quotations as f64 * 100.0
        };

        Self { total_quotations, quotations_with_discount, discount_percentage }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{NewQuotation, QuotationId, QuotationStats};
    use crate::domain::{client::ClientInfo, machine::MachineCode};

    #[test]
    fn stats_report_share_of_discounted_quotations() {
        let stats = QuotationStats::from_counts(3, 1);

        assert_eq!(stats.total_quotations, 3);
        assert_eq!(stats.quotations_with_discount, 1);
        assert!((stats.discount_percentage - 33.333_333).abs() < 1e-4);
    }

    #[test]
    fn stats_for_empty_store_are_zero() {
        let stats = QuotationStats::from_counts(0, 0);
        assert_eq!(stats.discount_percentage, 0.0);
    }

    #[test]
    fn record_serializes_with_flat_client_fields() {
        let record = NewQuotation {
            machine_code: MachineCode::from("ACO001"),
            client: ClientInfo::new("20-12345678-9", "Juan Pérez", "+5411"),
            discount_applied: true,
            discount_percent: Decimal::from(10),
            base_price: Decimal::from(25_000),
            final_price: Decimal::from(22_500),
        }
        .into_record(QuotationId(7), Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap());

        let json = serde_json::to_value(&record).expect("serialize quotation");
        assert_eq!(json["id"], 7);
        assert_eq!(json["machine_code"], "ACO001");
        assert_eq!(json["client_cuit"], "20-12345678-9");
        assert_eq!(json["client_name"], "Juan Pérez");
        assert_eq!(json["final_price"], serde_json::json!(22500.0));
        assert_eq!(json["discount_applied"], true);
    }
}
