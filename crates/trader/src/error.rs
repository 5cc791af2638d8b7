//! Trader service errors and their gRPC mapping

use orders::{OrdersError, RefId};
use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum TraderError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Order not found: ref_id {0}")]
    NotFound(RefId),

    /// The cached order has no exchange id to cancel
    #[error("Order {0} has no exchange order id")]
    NotCancellable(RefId),

    /// Exchange-reported failure, with the exchange's text
    #[error("{0}")]
    Rejected(String),

    #[error("No confirmation for ref_id {0} before the submit timeout")]
    Timeout(RefId),

    #[error(transparent)]
    Exchange(#[from] OrdersError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TraderError>;

impl From<TraderError> for Status {
    fn from(err: TraderError) -> Self {
        let message = err.to_string();
        match err {
            TraderError::InvalidArgument(_) => Status::invalid_argument(message),
            TraderError::NotFound(_) => Status::not_found(message),
            TraderError::NotCancellable(_) => Status::failed_precondition(message),
            TraderError::Timeout(_) => Status::deadline_exceeded(message),
            TraderError::Rejected(_) | TraderError::Exchange(_) | TraderError::Internal(_) => {
                Status::internal(message)
            }
        }
    }
}
