use thiserror::Error;
use uamon_core::filter::FilterError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("monitored item {0} does not exist")]
    UnknownItem(u32),
    #[error("target is not known to the address space")]
    UnknownTarget,
    #[error("data change filter rejected: {0}")]
    FilterRejected(#[from] FilterError),
    #[error("data change filters are only supported for the value attribute")]
    FilterUnsupported,
    #[error("too many monitored items (limit {limit})")]
    TooManyItems { limit: usize },
    #[error("monitored item {0} is not in reporting mode")]
    NotReporting(u32),
}
