use std::sync::Arc;

use aws_sdk_ec2::types::Tag as Ec2Tag;
use tokio::runtime::Runtime;

use super::service_error;
use crate::item::Tag;
use crate::services::{ComputeService, ServiceError};

/// Compute service backed by EC2.
pub struct AwsCompute {
    client: aws_sdk_ec2::Client,
    runtime: Arc<Runtime>,
}

impl AwsCompute {
    pub fn new(client: aws_sdk_ec2::Client, runtime: Arc<Runtime>) -> Self {
        Self { client, runtime }
    }
}

impl ComputeService for AwsCompute {
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<(), ServiceError> {
        let mut request = self.client.create_tags().resources(resource_id);
        for tag in tags {
            request = request.tags(Ec2Tag::builder().key(&tag.key).value(&tag.value).build());
        }

        self.runtime
            .block_on(request.send())
            .map_err(|e| service_error("CreateTags", e))?;
        Ok(())
    }

    fn stop_instances(&self, instance_ids: &[String]) -> Result<(), ServiceError> {
        let mut request = self.client.stop_instances();
        for id in instance_ids {
            request = request.instance_ids(id);
        }

        self.runtime
            .block_on(request.send())
            .map_err(|e| service_error("StopInstances", e))?;
        Ok(())
    }
}
