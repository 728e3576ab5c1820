use shared::protocol::{GstGenerateResponse, GstSummaryRow};
use tracing::info;

use super::period_request;
use crate::application::captcha::GuardedClient;
use crate::domain::Period;
use crate::error::ApiError;

/// Generates the GSTR1 summary for `period`
pub async fn execute(client: &GuardedClient, period: Period) -> Result<Vec<GstSummaryRow>, ApiError> {
    let request = period_request("/gst/generate", period)?;
    let response = client.perform_guarded(request).await?;
    let generated: GstGenerateResponse = response.decode()?;
    let rows = generated.summary.unwrap_or_default();
    info!(period = %period, rows = rows.len(), "GST summary generated");
    Ok(rows)
}
