// AWS Service Adapter
//
// Implements the collaborator contracts on top of the AWS SDK. The SDK
// is async; every call is driven to completion on a private
// current-thread runtime so the evaluator itself stays synchronous.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tokio::runtime::Runtime;

use crate::credentials::TemporaryCredentials;
use crate::services::{ClientConnector, CredentialExchange, ServiceClients, ServiceError};

mod config;
mod ec2;

pub use config::AwsConfigService;
pub use ec2::AwsCompute;

/// Loads shared AWS configuration once and builds per-invocation clients.
pub struct AwsConnector {
    runtime: Arc<Runtime>,
    sdk_config: SdkConfig,
}

impl AwsConnector {
    /// Resolve credentials and region from the environment, optionally
    /// overriding the region.
    pub fn load(region: Option<&str>) -> Result<Self, ServiceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ServiceError::new("LoadConfig", e.to_string()))?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk_config = runtime.block_on(loader.load());

        Ok(Self {
            runtime: Arc::new(runtime),
            sdk_config,
        })
    }
}

impl ClientConnector for AwsConnector {
    fn connect(&self, credentials: Option<&TemporaryCredentials>) -> Result<ServiceClients, ServiceError> {
        let (config_client, ec2_client) = match credentials {
            None => (
                aws_sdk_config::Client::new(&self.sdk_config),
                aws_sdk_ec2::Client::new(&self.sdk_config),
            ),
            Some(creds) => {
                let provider = aws_sdk_config::config::Credentials::new(
                    &creds.access_key_id,
                    &creds.secret_access_key,
                    Some(creds.session_token.clone()),
                    None,
                    "assume-role",
                );
                let config_conf = aws_sdk_config::config::Builder::from(&self.sdk_config)
                    .credentials_provider(provider.clone())
                    .build();
                let ec2_conf = aws_sdk_ec2::config::Builder::from(&self.sdk_config)
                    .credentials_provider(provider)
                    .build();
                (
                    aws_sdk_config::Client::from_conf(config_conf),
                    aws_sdk_ec2::Client::from_conf(ec2_conf),
                )
            }
        };

        Ok(ServiceClients {
            config: Box::new(AwsConfigService::new(config_client, Arc::clone(&self.runtime))),
            compute: Box::new(AwsCompute::new(ec2_client, Arc::clone(&self.runtime))),
        })
    }
}

impl CredentialExchange for AwsConnector {
    fn assume_role(&self, role_arn: &str, session_name: &str) -> Result<TemporaryCredentials, ServiceError> {
        let client = aws_sdk_sts::Client::new(&self.sdk_config);
        let output = self
            .runtime
            .block_on(
                client
                    .assume_role()
                    .role_arn(role_arn)
                    .role_session_name(session_name)
                    .send(),
            )
            .map_err(|e| service_error("AssumeRole", e))?;

        let credentials = output
            .credentials()
            .ok_or_else(|| ServiceError::new("AssumeRole", "response carried no credentials"))?;

        Ok(TemporaryCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
        })
    }
}

/// Flatten an SDK error, keeping the service error code when there is one.
pub(crate) fn service_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_string);
    ServiceError {
        operation,
        code,
        message: DisplayErrorContext(&err).to_string(),
    }
}
