//! Classification of raw wallet-core results.
//!
//! The core answers every call with a `(success, message)` pair. Some failures
//! come back with `success == true` and a `RecoverableError` prefix; those are
//! turned into retryable failures here so nothing downstream has to look at
//! message text.

use tracing::debug;

use crate::ports::{CoreCall, WalletCorePort, WalletError};

const RECOVERABLE_PREFIX: &str = "RecoverableError";
/// Characters dropped from a recoverable message: the prefix plus its separator.
const RECOVERABLE_SKIP: usize = RECOVERABLE_PREFIX.len() + 1;

/// The raw pair copied out of the foreign result before it is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutcome {
    pub success: bool,
    pub message: String,
}

impl RawOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Plain failures may be retried.
    #[default]
    RetryOnFailure,
    /// Plain failures are final. Recoverable ones stay retryable.
    FailFast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub succeeded: bool,
    pub retryable: bool,
    pub payload_or_error: String,
    /// Set when the failure came from a `RecoverableError` message.
    pub recoverable: bool,
}

impl OperationOutcome {
    pub fn into_result(self) -> Result<String, WalletError> {
        if self.succeeded {
            Ok(self.payload_or_error)
        } else if self.recoverable {
            Err(WalletError::Recoverable(self.payload_or_error))
        } else {
            Err(WalletError::Rejected {
                message: self.payload_or_error,
                retryable: self.retryable,
            })
        }
    }
}

pub fn classify(raw: RawOutcome, policy: FailurePolicy) -> OperationOutcome {
    if raw.success && raw.message.starts_with(RECOVERABLE_PREFIX) {
        let stripped: String = raw.message.chars().skip(RECOVERABLE_SKIP).collect();
        return OperationOutcome {
            succeeded: false,
            retryable: true,
            payload_or_error: stripped.trim_start().to_owned(),
            recoverable: true,
        };
    }
    let retryable = match policy {
        FailurePolicy::RetryOnFailure => !raw.success,
        FailurePolicy::FailFast => false,
    };
    OperationOutcome {
        succeeded: raw.success,
        retryable,
        payload_or_error: raw.message,
        recoverable: false,
    }
}

/// Runs one foreign call and classifies it. Transport errors pass through untouched.
pub fn invoke<C: WalletCorePort + ?Sized>(
    core: &C,
    call: &CoreCall,
    policy: FailurePolicy,
) -> Result<OperationOutcome, WalletError> {
    debug!(call = %call.name(), handle = ?call.handle(), "wallet core call");
    let raw = core.call(call)?;
    let outcome = classify(raw, policy);
    debug!(
        call = %call.name(),
        succeeded = outcome.succeeded,
        retryable = outcome.retryable,
        "wallet core call classified"
    );
    Ok(outcome)
}

/// `invoke` followed by `into_result`.
pub fn execute<C: WalletCorePort + ?Sized>(
    core: &C,
    call: &CoreCall,
    policy: FailurePolicy,
) -> Result<String, WalletError> {
    invoke(core, call, policy)?.into_result()
}
