//! Display rules applied to invoice fields before layout.

pub mod amounts;
pub mod dates;
pub mod tax_rate;

pub use amounts::{with_currency, CURRENCY_SIGN};
pub use dates::{format_issue_date, parse_issue_time};
pub use tax_rate::{format_tax_rate, TaxRate};
