use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::errors::ApiError;

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::ConnectionRefused
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("connection refused")
        {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::TimedOut
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("timed out")
        {
            return true;
        }

        current = source.source();
    }

    false
}

/// Sorts a transport-level reqwest failure into the recoverable error
/// taxonomy the loop reports to the user.
pub(crate) fn classify_request_error(
    err: reqwest::Error,
    api_url: &str,
    timeout_secs: u64,
) -> ApiError {
    if err.is_timeout() || error_chain_has_timeout(&err) {
        return ApiError::Timeout {
            api_url: api_url.to_string(),
            timeout_secs,
        };
    }

    if err.is_connect() && error_chain_has_connection_refused(&err) {
        return ApiError::ConnectionRefused {
            api_url: api_url.to_string(),
        };
    }

    ApiError::Network {
        api_url: api_url.to_string(),
        source: err,
    }
}
