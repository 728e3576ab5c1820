use shared::protocol::DamageStatsResponse;

use super::period_request;
use crate::application::captcha::GuardedClient;
use crate::domain::Period;
use crate::error::ApiError;

/// Damage e-invoice filing progress for one company
#[derive(Debug, Clone, PartialEq)]
pub struct DamageRow {
    pub company: String,
    /// Rounded to whole rupees
    pub amount: i64,
    pub filed: u64,
    pub not_filed: u64,
}

pub async fn execute(client: &GuardedClient, period: Period) -> Result<Vec<DamageRow>, ApiError> {
    let request = period_request("/einvoice/damage/stats", period)?;
    let response = client.perform_guarded(request).await?;
    let stats: DamageStatsResponse = response.decode()?;

    Ok(stats
        .stats
        .unwrap_or_default()
        .into_iter()
        .map(|(company, s)| DamageRow {
            company,
            amount: s.amt.map(|a| a.as_f64()).unwrap_or(0.0).round() as i64,
            filed: s.filed.map(|a| a.as_f64()).unwrap_or(0.0).max(0.0) as u64,
            not_filed: s.not_filed.map(|a| a.as_f64()).unwrap_or(0.0).max(0.0) as u64,
        })
        .collect())
}

/// Filing only makes sense while some company still has unfiled invoices
pub fn can_file(rows: &[DamageRow]) -> bool {
    rows.iter().any(|row| row.not_filed > 0)
}
