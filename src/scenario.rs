use std::collections::HashSet;

use crate::models::{
    BilledMonthRow, BilledWeekRow, CapacityScenarioView, DistanceMonthRow, DistanceScenarioView,
    DistanceWeekRow, OverallScoreRow, OverallScoreView, PlacedMonthRow, PlacedWeekRow,
    SameAddressMonthRow, SameAddressScenarioView, SameAddressWeekRow,
};
use crate::risk::RiskFlags;

/// Month-level figures lifted from the weeks of that month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyRollup {
    pub ave_wkly_placements: Option<f64>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
}

fn rollup<'a, W: 'a>(
    weeks: &'a [W],
    placements: impl Fn(&W) -> i64,
    hours: impl Fn(&'a W) -> (&'a Option<String>, &'a Option<String>),
) -> WeeklyRollup {
    let Some(first) = weeks.first() else {
        return WeeklyRollup::default();
    };
    let total: i64 = weeks.iter().map(placements).sum();
    let (open, close) = hours(first);
    WeeklyRollup {
        ave_wkly_placements: Some(total as f64 / weeks.len() as f64),
        open_time: open.clone(),
        close_time: close.clone(),
    }
}

pub fn reduce_placed_weeks(weeks: &[PlacedWeekRow]) -> WeeklyRollup {
    rollup(weeks, |w| w.child_placements, |w| (&w.hours_open, &w.hours_close))
}

pub fn reduce_billed_weeks(weeks: &[BilledWeekRow]) -> WeeklyRollup {
    rollup(
        weeks,
        |w| w.billed_child_placements,
        |w| (&w.hours_open, &w.hours_close),
    )
}

pub fn parse_placed_weeks(weeks: &[PlacedWeekRow]) -> Vec<CapacityScenarioView> {
    weeks
        .iter()
        .map(|week| CapacityScenarioView {
            service_month: week.start_of_month.clone(),
            risk_flag: week.placed_over_capacity_flag,
            provider_capacity: week.provider_capacity,
            ave_wkly_placements: Some(week.child_placements as f64),
            perc_deviation: week.perc_deviation,
            before_after_school: week.before_and_after_school,
            part_time: week.part_time,
            variable_schedule: week.variable_schedule,
            full_time: week.full_time,
            full_time_over_cap: week.provider_capacity < week.full_time,
            open_time: week.hours_open.clone(),
            close_time: week.hours_close.clone(),
            sub_rows: None,
        })
        .collect()
}

pub fn parse_billed_weeks(weeks: &[BilledWeekRow]) -> Vec<CapacityScenarioView> {
    weeks
        .iter()
        .map(|week| CapacityScenarioView {
            service_month: week.start_of_month.clone(),
            risk_flag: week.billed_over_capacity_flag,
            provider_capacity: week.provider_capacity,
            ave_wkly_placements: Some(week.billed_child_placements as f64),
            perc_deviation: week.perc_deviation,
            before_after_school: week.before_and_after_school,
            part_time: week.part_time,
            variable_schedule: week.variable_schedule,
            full_time: week.full_time,
            full_time_over_cap: week.provider_capacity < week.full_time,
            open_time: week.hours_open.clone(),
            close_time: week.hours_close.clone(),
            sub_rows: None,
        })
        .collect()
}

pub fn placed_views(rows: Vec<PlacedMonthRow>) -> Vec<CapacityScenarioView> {
    rows.into_iter()
        .map(|row| {
            let weekly = reduce_placed_weeks(&row.sub_rows);
            CapacityScenarioView {
                service_month: row.start_of_month,
                risk_flag: row.placed_over_capacity_flag,
                provider_capacity: row.provider_capacity,
                ave_wkly_placements: weekly.ave_wkly_placements,
                perc_deviation: row.perc_deviation,
                before_after_school: row.before_and_after_school,
                part_time: row.part_time,
                variable_schedule: row.variable_schedule,
                full_time: row.full_time,
                full_time_over_cap: row.provider_capacity < row.full_time,
                open_time: weekly.open_time,
                close_time: weekly.close_time,
                sub_rows: Some(parse_placed_weeks(&row.sub_rows)),
            }
        })
        .collect()
}

pub fn billed_views(rows: Vec<BilledMonthRow>) -> Vec<CapacityScenarioView> {
    rows.into_iter()
        .map(|row| {
            let weekly = reduce_billed_weeks(&row.sub_rows);
            CapacityScenarioView {
                service_month: row.start_of_month,
                risk_flag: row.billed_over_capacity_flag,
                provider_capacity: row.provider_capacity,
                ave_wkly_placements: weekly.ave_wkly_placements,
                perc_deviation: row.perc_deviation,
                before_after_school: row.before_and_after_school,
                part_time: row.part_time,
                variable_schedule: row.variable_schedule,
                full_time: row.full_time,
                full_time_over_cap: row.provider_capacity < row.full_time,
                open_time: weekly.open_time,
                close_time: weekly.close_time,
                sub_rows: Some(parse_billed_weeks(&row.sub_rows)),
            }
        })
        .collect()
}

pub fn parse_distance_weeks(weeks: &[DistanceWeekRow]) -> Vec<DistanceScenarioView> {
    weeks
        .iter()
        .map(|week| DistanceScenarioView {
            service_month: week.start_of_month.clone(),
            risk_flag: week.distance_traveled_flag,
            distinct_enrolled: week.family_count,
            ave_distance: week.average_distance_miles,
            sub_rows: None,
        })
        .collect()
}

pub fn distance_views(rows: Vec<DistanceMonthRow>) -> Vec<DistanceScenarioView> {
    rows.into_iter()
        .map(|row| DistanceScenarioView {
            sub_rows: Some(parse_distance_weeks(&row.sub_rows)),
            service_month: row.start_of_month,
            risk_flag: row.distance_traveled_flag,
            distinct_enrolled: row.family_count,
            ave_distance: row.average_distance_miles,
        })
        .collect()
}

pub fn parse_same_address_weeks(weeks: &[SameAddressWeekRow]) -> Vec<SameAddressScenarioView> {
    weeks
        .iter()
        .map(|week| SameAddressScenarioView {
            service_month: week.start_of_month.clone(),
            risk_flag: week.same_address_flag,
            provider_id: week.provider_licensing_id_match.clone(),
            provider_name: week.provider_name_match.clone(),
            postal_address: week.postal_address.clone(),
            open_date: week.open_date.clone(),
            close_date: week.close_date.clone(),
            sub_rows: None,
        })
        .collect()
}

/// Keeps the first row for each (matched provider, month). Rows arrive in
/// month order, so the first seen is the earliest.
pub fn same_address_views(rows: Vec<SameAddressMonthRow>) -> Vec<SameAddressScenarioView> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let month: String = row.start_of_month.chars().take(7).collect();
            seen.insert((row.provider_licensing_id_match.clone(), month))
        })
        .map(|row| SameAddressScenarioView {
            sub_rows: Some(parse_same_address_weeks(&row.sub_rows)),
            service_month: row.start_of_month,
            risk_flag: row.same_address_flag,
            provider_id: row.provider_licensing_id_match,
            provider_name: row.provider_name_match,
            postal_address: row.postal_address,
            open_date: row.open_date,
            close_date: row.close_date,
        })
        .collect()
}

pub fn overall_views(rows: Vec<OverallScoreRow>) -> Vec<OverallScoreView> {
    rows.into_iter()
        .map(|row| {
            let flags = RiskFlags::from_nullable(
                row.over_billed_capacity,
                row.over_placement_capacity,
                row.same_address_flag,
                row.distance_traveled_flag,
            );
            OverallScoreView {
                service_month: row.start_of_month,
                billed_over_capacity: flags.billed_over_capacity,
                placed_over_capacity: flags.placed_over_capacity,
                same_address: flags.same_address,
                distance_traveled: flags.distance_traveled,
                overall_risk_score: flags.score(),
            }
        })
        .collect()
}
