// Cross-Account Credentials
//
// Exchanges an execution role for temporary credentials. Failures are
// sanitized before they leave this module so that provider detail
// (account ids, role names) never reaches the caller.

use std::fmt;

use crate::services::CredentialExchange;

/// Fixed message reported when the role could not be assumed for lack of
/// permission.
pub const PERMISSION_DENIED_MESSAGE: &str = "AWS Config does not have permission to assume the IAM role.";

/// Marker used for both code and message of every other failure.
pub const INTERNAL_ERROR: &str = "InternalError";

/// Session name used for every role assumption.
pub const DEFAULT_SESSION_NAME: &str = "configLambdaExecution";

/// Short-lived credentials obtained by assuming a role.
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .finish()
    }
}

/// Sanitized role-assumption failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The role exists but may not be assumed. `code` is the provider's
    /// access-denied code; the message is always [`PERMISSION_DENIED_MESSAGE`].
    #[error("{code}: {}", PERMISSION_DENIED_MESSAGE)]
    PermissionDenied { code: String },

    #[error("{}: {}", INTERNAL_ERROR, INTERNAL_ERROR)]
    Internal,
}

impl CredentialError {
    pub fn code(&self) -> &str {
        match self {
            CredentialError::PermissionDenied { code } => code,
            CredentialError::Internal => INTERNAL_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            CredentialError::PermissionDenied { .. } => PERMISSION_DENIED_MESSAGE,
            CredentialError::Internal => INTERNAL_ERROR,
        }
    }
}

/// Assume `role_arn` and return its temporary credentials.
pub fn assume_role_credentials(
    exchange: &dyn CredentialExchange,
    role_arn: &str,
    session_name: &str,
) -> Result<TemporaryCredentials, CredentialError> {
    exchange.assume_role(role_arn, session_name).map_err(|err| {
        let sanitized = match err.code.as_deref() {
            Some(code) if code.contains("AccessDenied") => CredentialError::PermissionDenied { code: code.to_string() },
            _ => CredentialError::Internal,
        };
        tracing::warn!(code = sanitized.code(), "role assumption failed: {}", sanitized.message());
        sanitized
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::StaticCredentialExchange;
    use crate::services::ServiceError;

    const ROLE: &str = "arn:aws:iam::123456789012:role/config-eval";

    fn credentials() -> TemporaryCredentials {
        TemporaryCredentials {
            access_key_id: "ASIAEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: "token".into(),
        }
    }

    #[test]
    fn granted_credentials_are_returned() {
        let exchange = StaticCredentialExchange::granting(credentials());

        let creds = assume_role_credentials(&exchange, ROLE, DEFAULT_SESSION_NAME).unwrap();

        assert_eq!(creds, credentials());
        assert_eq!(exchange.requests(), vec![(ROLE.to_string(), DEFAULT_SESSION_NAME.to_string())]);
    }

    #[test]
    fn access_denied_is_rewritten() {
        let exchange = StaticCredentialExchange::failing(
            ServiceError::new(
                "AssumeRole",
                "User arn:aws:sts::123456789012:assumed-role/x is not authorized to perform sts:AssumeRole",
            )
            .with_code("AccessDenied"),
        );

        let err = assume_role_credentials(&exchange, ROLE, DEFAULT_SESSION_NAME).unwrap_err();

        assert_eq!(err, CredentialError::PermissionDenied { code: "AccessDenied".into() });
        assert_eq!(err.message(), PERMISSION_DENIED_MESSAGE);
        assert!(!err.to_string().contains("123456789012"));
    }

    #[test]
    fn other_failures_collapse_to_internal_error() {
        let exchange = StaticCredentialExchange::failing(
            ServiceError::new("AssumeRole", "role arn:aws:iam::123456789012:role/x does not exist")
                .with_code("NoSuchEntity"),
        );

        let err = assume_role_credentials(&exchange, ROLE, DEFAULT_SESSION_NAME).unwrap_err();

        assert_eq!(err, CredentialError::Internal);
        assert_eq!(err.code(), "InternalError");
        assert_eq!(err.to_string(), "InternalError: InternalError");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("secret\""));
        assert!(rendered.contains("redacted"));
    }
}
