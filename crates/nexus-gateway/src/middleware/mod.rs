//! Tower middleware applied to every request:
//! - `RequestIdLayer`: accepts or generates `x-request-id`
//! - `LoggingLayer`: one span and one completion event per request

mod logging;
mod request_id;

pub use logging::{LoggingLayer, LoggingMiddleware};
pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdLayer, RequestIdMiddleware};
