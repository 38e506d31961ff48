//! Shared data model for the starsync sales ETL.
//!
//! Transaction, reference and star-schema row types, watermark and run
//! tracking newtypes, and the structured [`error::ConnectorError`] model
//! used by every connector.

pub mod error;
pub mod sales;
pub mod star;
pub mod state;
