pub mod adapter;
pub mod dynamodb;
pub mod row;
pub mod watermark;

pub use adapter::{FetchOutcome, Page, RowSourceAdapter, SourceError, TablePages};
pub use dynamodb::DynamoTable;
pub use row::{FieldValue, Row};
pub use watermark::{QueryWindow, Watermark, WatermarkTracker, WATERMARK_FORMAT};
