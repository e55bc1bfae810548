//! Shared AWS plumbing: SDK config loading and SDK error mapping.

use crate::error::DbError;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatch::error::{DisplayErrorContext, SdkError};
use aws_types::SdkConfig;
use aws_types::region::Region;
use tracing::debug;

/// Load the shared SDK configuration for `region` from the default credential chain.
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    debug!(region = %region, "Loading AWS SDK configuration");
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_owned()))
        .load()
        .await
}

/// Map an SDK failure onto the error taxonomy.
///
/// Failures that never reached the service are connection errors; anything the
/// service answered (throttling, access denied, validation) is a query error.
pub fn sdk_error<E, R>(service: &str, operation: &str, err: SdkError<E, R>) -> DbError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => DbError::connection(
            format!("{service} {operation} could not reach the endpoint: {detail}"),
            "Check network access to the AWS endpoint and the configured region",
        ),
        SdkError::ConstructionFailure(_) => DbError::config(format!(
            "{service} {operation} request could not be built: {detail}"
        )),
        _ => DbError::query(
            format!("{service} {operation} failed: {detail}"),
            None,
            "Check the AWS credentials, IAM permissions and request parameters",
        ),
    }
}
