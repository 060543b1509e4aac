//! Event names and the macros that emit them.

pub const STARTUP: &str = "startup";
pub const SHUTDOWN: &str = "shutdown";
pub const LISTENING: &str = "listening";

/// The contract was parsed and every operation compiled.
pub const CONTRACT_LOADED: &str = "contract_loaded";

/// A request failed the contract and got the canned error.
pub const INVALID_REQUEST: &str = "invalid_request";

/// A handler's response failed the contract and was replaced.
pub const INVALID_RESPONSE: &str = "invalid_response";

/// The final response could not be written to the client.
pub const WRITE_FAILED: &str = "write_failed";

/// The request body stream broke before it was fully read.
pub const REQUEST_BODY_FAILED: &str = "request_body_failed";

/// A handler panicked before committing a response head.
pub const HANDLER_PANICKED: &str = "handler_panicked";

pub const CONNECTION_ERROR: &str = "connection_error";

#[doc(hidden)]
#[macro_export]
macro_rules! __log_event {
    ($level:ident, $name:ident, $($field:tt)*) => {
        $crate::__tracing::$level!(event = $crate::events::$name, $($field)*)
    };
}

#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => { $crate::__log_event!(info, STARTUP, $($field)*) };
}

#[macro_export]
macro_rules! log_shutdown {
    ($($field:tt)*) => { $crate::__log_event!(info, SHUTDOWN, $($field)*) };
}

#[macro_export]
macro_rules! log_listening {
    ($($field:tt)*) => { $crate::__log_event!(info, LISTENING, $($field)*) };
}

#[macro_export]
macro_rules! log_contract_loaded {
    ($($field:tt)*) => { $crate::__log_event!(info, CONTRACT_LOADED, $($field)*) };
}

#[macro_export]
macro_rules! log_invalid_request {
    ($($field:tt)*) => { $crate::__log_event!(warn, INVALID_REQUEST, $($field)*) };
}

#[macro_export]
macro_rules! log_invalid_response {
    ($($field:tt)*) => { $crate::__log_event!(warn, INVALID_RESPONSE, $($field)*) };
}

#[macro_export]
macro_rules! log_write_failed {
    ($($field:tt)*) => { $crate::__log_event!(error, WRITE_FAILED, $($field)*) };
}

#[macro_export]
macro_rules! log_request_body_failed {
    ($($field:tt)*) => { $crate::__log_event!(debug, REQUEST_BODY_FAILED, $($field)*) };
}

#[macro_export]
macro_rules! log_handler_panicked {
    ($($field:tt)*) => { $crate::__log_event!(error, HANDLER_PANICKED, $($field)*) };
}

#[macro_export]
macro_rules! log_connection_error {
    ($($field:tt)*) => { $crate::__log_event!(debug, CONNECTION_ERROR, $($field)*) };
}
