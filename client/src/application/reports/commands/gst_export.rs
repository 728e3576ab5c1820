use super::period_request;
use crate::application::captcha::GuardedClient;
use crate::domain::{ApiResponse, Period};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GstExport {
    /// Excel workbook of the summary
    Summary,
    /// Portal-ready GSTR1 JSON
    Json,
}

impl GstExport {
    fn path(&self) -> &'static str {
        match self {
            GstExport::Summary => "/gst/summary",
            GstExport::Json => "/gst/json",
        }
    }

    pub fn fallback_filename(&self, period: Period) -> String {
        match self {
            GstExport::Summary => format!("gst_summary_{}.xlsx", period),
            GstExport::Json => format!("gst_json_{}.json", period),
        }
    }
}

pub async fn execute(
    client: &GuardedClient,
    period: Period,
    export: GstExport,
) -> Result<ApiResponse, ApiError> {
    let request = period_request(export.path(), period)?.binary();
    client.perform_guarded(request).await
}
