//! # Public Receipt
//!
//! The customer-facing view of a bill, served by public id for shareable
//! receipt links.
//!
//! ## What Is Left Out
//! ```text
//! Bill.id            internal key        ✗
//! Bill.cashier_id    staff identity      ✗
//! Bill.customer_id   customer key        ✗
//! BillItem.id / product_id / bill_id     ✗
//! BillPayment.reference (UPI/card refs)  ✗
//! ```
//! Everything printed on a paper receipt stays in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use kirana_core::{
    BillItem, BillPayment, BillStatus, BillWithItems, PaymentMethod, PaymentMode, StoreSettings,
    SupplyType,
};

/// A receipt line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceiptLine {
    pub line_no: i64,
    pub name: String,
    pub sku: String,
    pub hsn_code: Option<String>,
    pub unit: String,
    pub quantity: i64,
    pub mrp_paise: i64,
    pub unit_price_paise: i64,
    pub discount_paise: i64,
    pub gst_rate_bps: u32,
    pub taxable_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    pub total_paise: i64,
    pub net_amount_paise: i64,
}

impl From<&BillItem> for ReceiptLine {
    fn from(item: &BillItem) -> Self {
        ReceiptLine {
            line_no: item.line_no,
            name: item.product_name.clone(),
            sku: item.product_sku.clone(),
            hsn_code: item.hsn_code.clone(),
            unit: item.unit.clone(),
            quantity: item.quantity,
            mrp_paise: item.mrp_paise,
            unit_price_paise: item.selling_price_paise,
            discount_paise: item.discount_paise,
            gst_rate_bps: item.gst_rate_bps,
            taxable_paise: item.taxable_paise,
            cgst_paise: item.cgst_paise,
            sgst_paise: item.sgst_paise,
            igst_paise: item.igst_paise,
            total_paise: item.total_paise,
            net_amount_paise: item.net_amount_paise,
        }
    }
}

/// A payment leg as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceiptPayment {
    pub method: PaymentMethod,
    pub amount_paise: i64,
}

impl From<&BillPayment> for ReceiptPayment {
    fn from(payment: &BillPayment) -> Self {
        ReceiptPayment {
            method: payment.method,
            amount_paise: payment.amount_paise,
        }
    }
}

/// A bill as the customer may see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PublicReceipt {
    pub public_id: String,
    pub store_name: String,
    pub currency_symbol: String,
    pub bill_number: String,
    pub status: BillStatus,
    pub customer_name: Option<String>,
    pub supply_type: SupplyType,
    pub items: Vec<ReceiptLine>,
    pub subtotal_paise: i64,
    pub item_discount_paise: i64,
    pub bill_discount_paise: i64,
    pub loyalty_discount_paise: i64,
    pub taxable_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    pub tax_total_paise: i64,
    pub round_off_paise: i64,
    pub grand_total_paise: i64,
    pub loyalty_points_earned: i64,
    pub payment_mode: PaymentMode,
    pub payments: Vec<ReceiptPayment>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl PublicReceipt {
    /// Builds the receipt. `settings` is `None` when the store row is gone;
    /// the receipt is still served without a store name.
    pub fn new(full: &BillWithItems, settings: Option<&StoreSettings>) -> Self {
        let bill = &full.bill;

        PublicReceipt {
            public_id: bill.public_id.clone(),
            store_name: settings.map(|s| s.store_name.clone()).unwrap_or_default(),
            currency_symbol: settings
                .map(|s| s.currency_symbol.clone())
                .unwrap_or_else(|| "₹".to_string()),
            bill_number: bill.bill_number.clone(),
            status: bill.status,
            customer_name: bill.customer_name.clone(),
            supply_type: bill.supply_type,
            items: full.items.iter().map(ReceiptLine::from).collect(),
            subtotal_paise: bill.subtotal_paise,
            item_discount_paise: bill.item_discount_paise,
            bill_discount_paise: bill.bill_discount_paise,
            loyalty_discount_paise: bill.loyalty_discount_paise,
            taxable_paise: bill.taxable_paise,
            cgst_paise: bill.cgst_paise,
            sgst_paise: bill.sgst_paise,
            igst_paise: bill.igst_paise,
            tax_total_paise: bill.tax_total_paise,
            round_off_paise: bill.round_off_paise,
            grand_total_paise: bill.grand_total_paise,
            loyalty_points_earned: bill.loyalty_points_earned,
            payment_mode: bill.payment_mode,
            payments: full.payments.iter().map(ReceiptPayment::from).collect(),
            created_at: bill.created_at,
            completed_at: bill.completed_at,
            cancelled_at: bill.cancelled_at,
        }
    }
}
