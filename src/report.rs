use csv::Writer;

use crate::error::AppError;
use crate::models::{MonthlyRiskRow, MonthlyView, YearlyRiskRow, YearlyView};
use crate::risk::{flag_label, RiskFlags, RiskPolicy, YearlyCounts};

pub const MONTHLY_HEADERS: [&str; 13] = [
    "Provider ID",
    "Provider Name",
    "Service Month",
    "Billed Over Capacity",
    "Placed Over Capacity",
    "Same Address",
    "Distance Traveled",
    "Overall Risk Score",
    "Flagged",
    "Comment",
    "Postal Address",
    "City",
    "Zip",
];

pub const YEARLY_HEADERS: [&str; 13] = [
    "Provider ID",
    "Provider Name",
    "Billed Over Capacity",
    "Placed Over Capacity",
    "Same Address",
    "Distance Traveled",
    "Overall Risk Score",
    "High Risk",
    "Flagged",
    "Comment",
    "Postal Address",
    "City",
    "Zip",
];

pub fn monthly_views(rows: Vec<MonthlyRiskRow>) -> Vec<MonthlyView> {
    rows.into_iter()
        .map(|row| {
            let flags = RiskFlags::from_nullable(
                row.over_billed_capacity,
                row.over_placement_capacity,
                row.same_address_flag,
                row.distance_traveled_flag,
            );
            MonthlyView {
                provider_id: row.provider_licensing_id,
                provider_name: row.provider_name,
                service_month: row.start_of_month,
                billed_over_capacity: flag_label(flags.billed_over_capacity),
                placed_over_capacity: flag_label(flags.placed_over_capacity),
                same_address: flag_label(flags.same_address),
                distance_traveled: flag_label(flags.distance_traveled),
                overall_risk_score: flags.score(),
                flagged: row.is_flagged.unwrap_or(false),
                comment: row.comment,
                postal_address: row.postal_address,
                city: row.city,
                zip: row.zip,
            }
        })
        .collect()
}

pub fn yearly_views(rows: Vec<YearlyRiskRow>, policy: &RiskPolicy) -> Vec<YearlyView> {
    rows.into_iter()
        .map(|row| {
            let counts = YearlyCounts {
                billed_over_capacity: row.total_billed_over_capacity,
                placed_over_capacity: row.total_placed_over_capacity,
                same_address: row.total_same_address,
                distance_traveled: row.total_distance_traveled,
            };
            let score = counts.score();
            YearlyView {
                provider_id: row.provider_licensing_id,
                provider_name: row.provider_name,
                billed_over_capacity: counts.billed_over_capacity,
                placed_over_capacity: counts.placed_over_capacity,
                same_address: counts.same_address,
                distance_traveled: counts.distance_traveled,
                overall_risk_score: score,
                high_risk: policy.is_high_risk(score),
                flagged: row.is_flagged.unwrap_or(false),
                comment: row.comment,
                postal_address: row.postal_address,
                city: row.city,
                zip: row.zip,
            }
        })
        .collect()
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

pub fn monthly_csv(views: &[MonthlyView]) -> Result<Vec<u8>, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    write_record(&mut writer, MONTHLY_HEADERS.iter().map(|h| h.to_string()))?;

    for view in views {
        write_record(
            &mut writer,
            [
                view.provider_id.clone(),
                text(&view.provider_name).to_string(),
                view.service_month.clone(),
                view.billed_over_capacity.to_string(),
                view.placed_over_capacity.to_string(),
                view.same_address.to_string(),
                view.distance_traveled.to_string(),
                view.overall_risk_score.to_string(),
                flag_label(view.flagged).to_string(),
                text(&view.comment).to_string(),
                text(&view.postal_address).to_string(),
                text(&view.city).to_string(),
                text(&view.zip).to_string(),
            ],
        )?;
    }

    finish(writer)
}

pub fn yearly_csv(views: &[YearlyView]) -> Result<Vec<u8>, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    write_record(&mut writer, YEARLY_HEADERS.iter().map(|h| h.to_string()))?;

    for view in views {
        write_record(
            &mut writer,
            [
                view.provider_id.clone(),
                text(&view.provider_name).to_string(),
                view.billed_over_capacity.to_string(),
                view.placed_over_capacity.to_string(),
                view.same_address.to_string(),
                view.distance_traveled.to_string(),
                view.overall_risk_score.to_string(),
                flag_label(view.high_risk).to_string(),
                flag_label(view.flagged).to_string(),
                text(&view.comment).to_string(),
                text(&view.postal_address).to_string(),
                text(&view.city).to_string(),
                text(&view.zip).to_string(),
            ],
        )?;
    }

    finish(writer)
}

fn write_record(
    writer: &mut Writer<Vec<u8>>,
    record: impl IntoIterator<Item = String>,
) -> Result<(), AppError> {
    writer
        .write_record(record)
        .map_err(|err| AppError::internal(format!("failed to write CSV row: {err}")))
}

fn finish(writer: Writer<Vec<u8>>) -> Result<Vec<u8>, AppError> {
    writer
        .into_inner()
        .map_err(|err| AppError::internal(format!("failed to flush CSV: {err}")))
}
