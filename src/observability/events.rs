//! Observable gateway events
//!
//! Every line the gateway logs about its own lifecycle, the request
//! registry, or the auth layer is named by one of these variants.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    BootStart,
    ConfigLoaded,
    Serving,
    ShutdownComplete,

    // Request registry
    RequestSubmitted,
    RequestRejected,
    RequestDispatchFailed,
    RequestRunning,
    RequestBatchStarted,
    RequestCommandFailed,
    RequestFinished,
    RequestDeleted,
    RequestsCleaned,
    CompletionIgnored,

    // Executor
    CommandApplied,

    // Auth
    TokenIssued,
    TokenReused,
    TokenRevoked,
    AuthRejected,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "GATEWAY_STARTUP_BEGIN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Serving => "GATEWAY_SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::RequestSubmitted => "REQUEST_SUBMITTED",
            Event::RequestRejected => "REQUEST_REJECTED",
            Event::RequestDispatchFailed => "REQUEST_DISPATCH_FAILED",
            Event::RequestRunning => "REQUEST_RUNNING",
            Event::RequestBatchStarted => "REQUEST_BATCH_STARTED",
            Event::RequestCommandFailed => "REQUEST_COMMAND_FAILED",
            Event::RequestFinished => "REQUEST_FINISHED",
            Event::RequestDeleted => "REQUEST_DELETED",
            Event::RequestsCleaned => "REQUESTS_CLEANED",
            Event::CompletionIgnored => "COMPLETION_IGNORED",

            Event::CommandApplied => "COMMAND_APPLIED",

            Event::TokenIssued => "TOKEN_ISSUED",
            Event::TokenReused => "TOKEN_REUSED",
            Event::TokenRevoked => "TOKEN_REVOKED",
            Event::AuthRejected => "AUTH_REJECTED",
        }
    }

    /// Default severity when logged through `Logger::event`
    pub fn severity(&self) -> Severity {
        match self {
            Event::RequestDispatchFailed => Severity::Error,
            Event::RequestRejected | Event::RequestCommandFailed | Event::AuthRejected => {
                Severity::Warn
            }
            Event::RequestBatchStarted | Event::CompletionIgnored | Event::CommandApplied => {
                Severity::Trace
            }
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
