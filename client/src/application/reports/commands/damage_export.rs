use tracing::info;

use super::damage_stats;
use super::period_request;
use crate::application::captcha::GuardedClient;
use crate::domain::{ApiResponse, Period};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageExport {
    /// Files the outstanding damage e-invoices and returns the receipt
    File,
    Excel,
    Pdf,
}

impl DamageExport {
    fn path(&self) -> &'static str {
        match self {
            DamageExport::File => "/einvoice/damage/file",
            DamageExport::Excel => "/einvoice/damage/excel",
            DamageExport::Pdf => "/einvoice/damage/pdf",
        }
    }

    pub fn fallback_filename(&self, period: Period) -> String {
        match self {
            DamageExport::Pdf => format!("damage_{}.pdf", period),
            DamageExport::File | DamageExport::Excel => format!("damage_{}.xlsx", period),
        }
    }
}

pub async fn execute(
    client: &GuardedClient,
    period: Period,
    export: DamageExport,
) -> Result<ApiResponse, ApiError> {
    let request = period_request(export.path(), period)?.binary();

    match export {
        DamageExport::File => {
            let rows = damage_stats::execute(client, period).await?;
            if !damage_stats::can_file(&rows) {
                return Err(ApiError::Precondition(format!(
                    "Nothing left to file for {}",
                    period
                )));
            }
            info!(period = %period, "filing damage e-invoices");
            client.perform_guarded(request).await
        }
        // The excel export is served without a captcha gate
        DamageExport::Excel => client.perform(&request).await,
        DamageExport::Pdf => client.perform_guarded(request).await,
    }
}
