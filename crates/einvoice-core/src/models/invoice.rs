//! Invoice record tree matching the electronic invoice accounting data standard.
//!
//! Field names follow the XML element names of the standard. Amounts, prices and
//! quantities are kept as the decimal strings found in the source document; they
//! are displayed verbatim and never recomputed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};

use crate::invoice::rules::dates::parse_issue_time;

/// A complete electronic invoice document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EInvoice {
    /// Invoice header with the inherent labels.
    pub header: Header,

    /// Business content of the invoice.
    #[serde(rename = "EInvoiceData")]
    pub data: EInvoiceData,

    /// Tax supervision block (number and issue time).
    pub tax_supervision_info: TaxSupervisionInfo,
}

impl EInvoice {
    /// Title shown at the top of the page, e.g. `电子发票（增值税专用发票）`.
    pub fn title(&self) -> String {
        let labels = &self.header.inherent_label;
        format!(
            "{}（{}）",
            labels.e_invoice_type.label_name, labels.general_or_special_vat.label_name
        )
    }

    /// Invoice number from the tax supervision block.
    pub fn invoice_number(&self) -> &str {
        &self.tax_supervision_info.invoice_number
    }

    /// Line items in document order.
    pub fn items(&self) -> &[IssueItem] {
        &self.data.items
    }

    /// Remark text, empty when the document carries none.
    pub fn remark(&self) -> &str {
        self.data
            .additional_information
            .as_ref()
            .and_then(|info| info.remark.as_deref())
            .unwrap_or("")
    }
}

/// Document header.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Header {
    /// Inherent labels describing the invoice kind.
    pub inherent_label: InherentLabel,
}

/// Inherent labels of the invoice.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InherentLabel {
    /// Invoice type, e.g. `电子发票`.
    pub e_invoice_type: Label,

    /// VAT category, e.g. `增值税专用发票` or `普通发票`.
    #[serde(rename = "GeneralOrSpecialVAT")]
    pub general_or_special_vat: Label,
}

/// Enumerated label: a code with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    /// Code as defined by the standard.
    pub label_code: String,

    /// Human readable name.
    pub label_name: String,
}

/// Tax supervision block.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaxSupervisionInfo {
    /// Invoice number.
    pub invoice_number: String,

    /// Time the invoice was issued.
    #[serde(deserialize_with = "deserialize_issue_time")]
    pub issue_time: NaiveDateTime,
}

/// Business content of the invoice.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EInvoiceData {
    /// Seller party.
    pub seller_information: SellerInformation,

    /// Buyer party.
    pub buyer_information: BuyerInformation,

    /// Aggregate totals and drawer.
    pub basic_information: BasicInformation,

    /// Line items, in document order.
    #[serde(rename = "IssuItemInformation", default)]
    pub items: Vec<IssueItem>,

    /// Free-text additions such as the remark.
    #[serde(default)]
    pub additional_information: Option<AdditionalInformation>,
}

/// Seller party.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SellerInformation {
    /// Unified social credit code / taxpayer identification number.
    pub seller_id_num: String,

    /// Seller name.
    pub seller_name: String,
}

/// Buyer party.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuyerInformation {
    /// Unified social credit code / taxpayer identification number.
    pub buyer_id_num: String,

    /// Buyer name.
    pub buyer_name: String,
}

/// Aggregate totals.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BasicInformation {
    /// Total amount excluding tax.
    pub total_am_without_tax: String,

    /// Total tax amount.
    pub total_tax_am: String,

    /// Total amount including tax.
    #[serde(rename = "TotalTax-includedAmount", alias = "TotalTaxIncludedAmount")]
    pub total_tax_included_amount: String,

    /// Total amount including tax, spelled out in Chinese capital numerals.
    #[serde(
        rename = "TotalTax-includedAmountInChinese",
        alias = "TotalTaxIncludedAmountInChinese"
    )]
    pub total_tax_included_amount_in_chinese: String,

    /// Person who issued the invoice.
    pub drawer: String,
}

/// A single line item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IssueItem {
    /// Goods or service name.
    pub item_name: String,

    /// Specification / model.
    #[serde(default)]
    pub spec_mod: Option<String>,

    /// Unit of measure.
    #[serde(default)]
    pub mea_units: Option<String>,

    /// Quantity.
    #[serde(default)]
    pub quantity: Option<String>,

    /// Unit price.
    #[serde(default)]
    pub un_price: Option<String>,

    /// Line amount excluding tax.
    pub amount: String,

    /// Tax rate as a decimal fraction (`0.06`) or a placeholder token.
    pub tax_rate: String,

    /// Computed tax amount.
    pub com_tax_am: String,
}

/// Free-text additions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdditionalInformation {
    /// Remark text.
    #[serde(default)]
    pub remark: Option<String>,
}

fn deserialize_issue_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_issue_time(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid value for IssueTime: {}", raw))
    })
}
