//! Error reporting sink.
//!
//! Errors that reach the presentation boundary are also handed to a sink as
//! a side observation. Reporting never fails and never changes the error the
//! caller sees.
use log::error;

use crate::GdError;

pub trait ErrorSink: Send + Sync {
    fn report(&self, context: &str, error: &GdError);
}

/// Default sink: writes the error to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, context: &str, err: &GdError) {
        match err.code() {
            Some(code) => error!("[{}] {} ({})", context, err, code),
            None => error!("[{}] {}", context, err),
        }
    }
}
