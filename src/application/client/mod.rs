mod borrow_workflow;
mod cache;
mod catalog;
mod errors;

pub use borrow_workflow::{BorrowFailure, BorrowState, BorrowWorkflow, Notice, NoticeLevel};
pub use cache::BookCache;
pub use catalog::CatalogClient;
pub use errors::{BorrowErrorKind, BorrowWorkflowError};
