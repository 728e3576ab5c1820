// Report commands

pub mod gst_generate;
pub mod gst_export;
pub mod damage_stats;
pub mod damage_export;

use shared::protocol::PeriodRequest;

use crate::domain::{Period, RequestDescriptor};
use crate::error::ApiError;

fn period_request(path: &str, period: Period) -> Result<RequestDescriptor, ApiError> {
    let body = PeriodRequest {
        period: period.to_string(),
    };
    RequestDescriptor::post_json(path, &body).map_err(ApiError::Decode)
}
