//! ERP REST API access: authenticated client and the property record query

pub mod client;
pub mod properties;

pub use client::ErpClient;
pub use properties::{fetch_properties, Filters, Property, DEFAULT_LIMIT};
