//! Convenience re-exports for connector authors.
//!
//! ```ignore
//! use starsync_sdk::prelude::*;
//! ```

// Connector traits
pub use crate::connector::{NameLookup, ReferenceSource, SalesSource, WarehouseSink};

// Errors
pub use starsync_types::error::{
    CommitState, ConnectorError, ErrorCategory, ValidationResult, ValidationStatus,
};

// Data model
pub use starsync_types::sales::{CategoryRecord, TransactionRecord};
pub use starsync_types::star::{
    CalendarDim, CategoryDim, EmployeeDim, LoadSummary, SalesFact, StarBatch,
};
pub use starsync_types::state::Watermark;
