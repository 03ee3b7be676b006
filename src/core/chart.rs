use serde::Serialize;

use super::types::{ProjectionResult, SchedulePoint};

pub const MAX_PLOT_POINTS: usize = 200;
pub const DEFAULT_Y_TICK_COUNT: u32 = 5;

const EXACT_FRACTION_DIGITS: usize = 1074;
const MONTH_TICK_STEP: u32 = 6;
const MONTH_AXIS_LIMIT: u32 = 60;
const MAX_YEARS_TICKED_INDIVIDUALLY: u32 = 5;
const YEAR_TICK_INTERVALS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisUnit {
    Months,
    Years,
}

impl AxisUnit {
    pub fn label(self) -> &'static str {
        match self {
            AxisUnit::Months => "Months",
            AxisUnit::Years => "Years",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    /// Position along the time axis in months.
    pub month: u32,
    /// Tick value in the axis unit.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeAxis {
    pub unit: AxisUnit,
    pub label: &'static str,
    pub ticks: Vec<AxisTick>,
}

/// Thins a schedule to at most roughly `max_points` balance points and pins
/// the series start to month 0 at the opening balance.
pub fn downsample(
    schedule: &[SchedulePoint],
    principal: f64,
    max_points: usize,
) -> Vec<PlotPoint> {
    if schedule.is_empty() {
        return Vec::new();
    }

    let step = schedule.len().div_ceil(max_points.max(1)).max(1);
    let mut sampled: Vec<PlotPoint> = schedule
        .iter()
        .step_by(step)
        .map(|p| PlotPoint {
            x: p.month as f64,
            y: p.balance,
        })
        .collect();

    let start = PlotPoint { x: 0.0, y: principal };
    match sampled.first_mut() {
        Some(first) if first.x <= 0.0 => *first = start,
        _ => sampled.insert(0, start),
    }
    sampled
}

/// Round-number ticks from 0 up to the first step multiple at or above `max_y`.
pub fn nice_y_ticks(max_y: f64, count: u32) -> Vec<f64> {
    if !max_y.is_finite() || max_y <= 0.0 {
        return vec![0.0];
    }

    let count = count.max(1) as f64;
    let exponent = max_y.log10().floor() as i32;
    let base = 10f64.powi(exponent);

    // The last resort is the next power of ten, which always fits in one interval.
    let step = [1.0f64, 2.0, 5.0, 10.0]
        .into_iter()
        .map(|c| c * 10f64.powi(exponent - c.log10().floor() as i32))
        .find(|s| (max_y / s).ceil() <= count)
        .unwrap_or(base * 10.0);

    let intervals = (max_y / step).ceil() as u32;
    (0..=intervals).map(|i| i as f64 * step).collect()
}

/// Picks month or year ticks for a series ending at `final_month`.
pub fn x_axis_ticks(final_month: f64) -> TimeAxis {
    let total_months = final_month.ceil().max(1.0) as u32;

    if total_months < MONTH_AXIS_LIMIT {
        let max_tick =
            MONTH_TICK_STEP.max(total_months.div_ceil(MONTH_TICK_STEP) * MONTH_TICK_STEP);
        let ticks = (0..=max_tick)
            .step_by(MONTH_TICK_STEP as usize)
            .map(|m| AxisTick {
                month: m,
                label: m.to_string(),
            })
            .collect();
        return TimeAxis {
            unit: AxisUnit::Months,
            label: AxisUnit::Months.label(),
            ticks,
        };
    }

    let total_years = (final_month / 12.0).ceil().max(1.0) as u32;
    let mut years: Vec<u32> = if total_years <= MAX_YEARS_TICKED_INDIVIDUALLY {
        (0..=total_years).collect()
    } else {
        let step = total_years.div_ceil(YEAR_TICK_INTERVALS);
        (0..=total_years).step_by(step as usize).collect()
    };
    if years.last() != Some(&total_years) {
        years.push(total_years);
    }

    TimeAxis {
        unit: AxisUnit::Years,
        label: AxisUnit::Years.label(),
        ticks: years
            .into_iter()
            .map(|y| AxisTick {
                month: y * 12,
                label: y.to_string(),
            })
            .collect(),
    }
}

/// Compact dollar label for axis ticks: `$1.5M`, `$20k`, `$250`.
pub fn format_short(value: f64) -> String {
    if value.abs() >= 1_000_000.0 {
        let digits = if value % 1_000_000.0 != 0.0 { 1 } else { 0 };
        return format!("${}M", to_fixed(value / 1_000_000.0, digits));
    }
    if value.abs() >= 1_000.0 {
        return format!("${}k", js_round(value / 1_000.0) as i64);
    }
    if value == 0.0 {
        return "$0".to_string();
    }
    format!("${value}")
}

pub fn format_duration(months: u32) -> String {
    if months == 0 {
        return "0 months".to_string();
    }
    let years = months / 12;
    let rem = months % 12;
    if years == 0 {
        format!("{months} months")
    } else if rem == 0 {
        format!("{years}y ({months} mo)")
    } else {
        format!("{years}y {rem}m ({months} mo)")
    }
}

/// Whole-dollar amount with thousands separators, e.g. `$21,473`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Fixed-point text rounded from the exact binary value of `value`, with exact
/// ties going away from zero. `1.45` is stored just below the tie and prints
/// as `1.4`; `1.25` is an exact tie and prints as `1.3`.
fn to_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    // Enough fractional digits to spell out any f64 exactly.
    let exact = format!("{:.*}", EXACT_FRACTION_DIGITS, value.abs());
    let (whole, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let (kept, dropped) = fraction.split_at(digits.min(fraction.len()));

    let mut number: Vec<char> = whole.chars().chain(kept.chars()).collect();
    if dropped.starts_with(['5', '6', '7', '8', '9']) {
        increment_digits(&mut number);
    }

    let split = number.len() - digits;
    let mut text = String::with_capacity(number.len() + 2);
    if value < 0.0 {
        text.push('-');
    }
    text.extend(&number[..split]);
    if digits > 0 {
        text.push('.');
        text.extend(&number[split..]);
    }
    text
}

fn increment_digits(number: &mut Vec<char>) {
    for digit in number.iter_mut().rev() {
        if *digit == '9' {
            *digit = '0';
        } else {
            *digit = char::from(*digit as u8 + 1);
            return;
        }
    }
    number.insert(0, '1');
}

/// Nearest integer with ties rounded towards positive infinity.
fn js_round(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartFrame {
    pub width: f64,
    pub height: f64,
    pub padding_left: f64,
    pub padding_right: f64,
    pub padding_top: f64,
    pub padding_bottom: f64,
}

impl Default for ChartFrame {
    fn default() -> Self {
        Self {
            width: 180.0,
            height: 112.0,
            padding_left: 6.0,
            padding_right: 2.0,
            padding_top: 6.0,
            padding_bottom: 18.0,
        }
    }
}

impl ChartFrame {
    /// Shorter frame used while the loan form is open next to the chart.
    pub fn editing() -> Self {
        Self {
            height: 84.0,
            padding_left: 8.0,
            padding_bottom: 14.0,
            ..Self::default()
        }
    }

    fn chart_width(&self) -> f64 {
        self.width - self.padding_left - self.padding_right
    }

    fn chart_height(&self) -> f64 {
        self.height - self.padding_top - self.padding_bottom
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueTick {
    pub value: f64,
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTick {
    pub month: u32,
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChart {
    pub frame: ChartFrame,
    pub points: Vec<PlotPoint>,
    pub path: Option<String>,
    pub y_ticks: Vec<ValueTick>,
    pub x_ticks: Vec<TimeTick>,
    pub x_axis_label: &'static str,
}

struct Projector {
    frame: ChartFrame,
    final_month: f64,
    max_y: f64,
}

impl Projector {
    fn x_at(&self, month: f64) -> f64 {
        self.frame.padding_left + (month / self.final_month.max(1.0)) * self.frame.chart_width()
    }

    fn y_at(&self, value: f64) -> f64 {
        self.frame.padding_top + (1.0 - value / self.max_y.max(1.0)) * self.frame.chart_height()
    }
}

/// Lays out the balance-over-time series inside `frame`.
///
/// Fewer than two plot points produce no path and no ticks.
pub fn balance_chart(
    result: &ProjectionResult,
    principal: f64,
    frame: &ChartFrame,
) -> BalanceChart {
    let points = downsample(&result.schedule, principal, MAX_PLOT_POINTS);

    if points.len() < 2 {
        return BalanceChart {
            frame: *frame,
            points,
            path: None,
            y_ticks: Vec::new(),
            x_ticks: Vec::new(),
            x_axis_label: AxisUnit::Years.label(),
        };
    }

    let final_month = points
        .last()
        .map(|p| p.x)
        .filter(|x| *x != 0.0)
        .unwrap_or(1.0);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    let projector = Projector {
        frame: *frame,
        final_month,
        max_y,
    };

    let path = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{} {} {}",
                if i == 0 { 'M' } else { 'L' },
                to_fixed(projector.x_at(p.x), 2),
                to_fixed(projector.y_at(p.y), 2)
            )
        })
        .collect::<Vec<_>>()
        .join(" ");

    let y_ticks = nice_y_ticks(max_y, DEFAULT_Y_TICK_COUNT)
        .into_iter()
        .map(|value| ValueTick {
            value,
            position: projector.y_at(value),
            label: format_short(value),
        })
        .collect();

    let axis = x_axis_ticks(final_month);
    let x_ticks = axis
        .ticks
        .into_iter()
        .map(|tick| TimeTick {
            month: tick.month,
            position: projector.x_at(tick.month as f64),
            label: tick.label,
        })
        .collect();

    BalanceChart {
        frame: *frame,
        points,
        path: Some(path),
        y_ticks,
        x_ticks,
        x_axis_label: axis.label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LoanParameters, project};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn flat_schedule(months: u32) -> Vec<SchedulePoint> {
        (1..=months)
            .map(|month| SchedulePoint {
                month,
                balance: (months - month) as f64,
                interest_portion: 0.0,
                principal_portion: 1.0,
            })
            .collect()
    }

    fn tick_months(axis: &TimeAxis) -> Vec<u32> {
        axis.ticks.iter().map(|t| t.month).collect()
    }

    fn tick_labels(axis: &TimeAxis) -> Vec<&str> {
        axis.ticks.iter().map(|t| t.label.as_str()).collect()
    }

    #[test]
    fn downsample_short_schedule_keeps_every_point_and_prepends_start() {
        let points = downsample(&flat_schedule(3), 3.0, MAX_PLOT_POINTS);
        assert_eq!(
            points,
            vec![
                PlotPoint { x: 0.0, y: 3.0 },
                PlotPoint { x: 1.0, y: 2.0 },
                PlotPoint { x: 2.0, y: 1.0 },
                PlotPoint { x: 3.0, y: 0.0 },
            ]
        );
    }

    #[test]
    fn downsample_long_schedule_uses_ceiling_stride() {
        let points = downsample(&flat_schedule(450), 450.0, MAX_PLOT_POINTS);
        // stride = ceil(450 / 200) = 3 -> indices 0, 3, ..., 447 plus the month-0 anchor
        assert_eq!(points.len(), 151);
        assert_eq!(points[0], PlotPoint { x: 0.0, y: 450.0 });
        assert_eq!(points[1].x, 1.0);
        assert_eq!(points[2].x, 4.0);
        assert_eq!(points.last().map(|p| p.x), Some(448.0));
    }

    #[test]
    fn downsample_empty_schedule_is_empty() {
        assert!(downsample(&[], 1_000.0, MAX_PLOT_POINTS).is_empty());
    }

    #[test]
    fn downsample_overwrites_a_month_zero_point() {
        let schedule = vec![
            SchedulePoint {
                month: 0,
                balance: 5.0,
                interest_portion: 0.0,
                principal_portion: 0.0,
            },
            SchedulePoint {
                month: 1,
                balance: 0.0,
                interest_portion: 0.0,
                principal_portion: 5.0,
            },
        ];
        let points = downsample(&schedule, 7.0, MAX_PLOT_POINTS);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], PlotPoint { x: 0.0, y: 7.0 });
    }

    #[test]
    fn nice_ticks_for_typical_balance() {
        assert_eq!(nice_y_ticks(20_000.0, 5), vec![0.0, 10_000.0, 20_000.0]);
        assert_eq!(
            nice_y_ticks(47_000.0, 5),
            vec![0.0, 10_000.0, 20_000.0, 30_000.0, 40_000.0, 50_000.0]
        );
        assert_eq!(nice_y_ticks(73_000.0, 5), vec![0.0, 20_000.0, 40_000.0, 60_000.0, 80_000.0]);
    }

    #[test]
    fn nice_ticks_degenerate_inputs_collapse_to_zero() {
        assert_eq!(nice_y_ticks(0.0, 5), vec![0.0]);
        assert_eq!(nice_y_ticks(-4.0, 5), vec![0.0]);
        assert_eq!(nice_y_ticks(f64::NAN, 5), vec![0.0]);
        assert_eq!(nice_y_ticks(f64::INFINITY, 5), vec![0.0]);
    }

    #[test]
    fn nice_ticks_fall_back_to_next_magnitude_for_tight_counts() {
        assert_eq!(nice_y_ticks(60.0, 1), vec![0.0, 100.0]);
    }

    #[test]
    fn short_payoff_ticks_in_six_month_steps() {
        let axis = x_axis_ticks(14.0);
        assert_eq!(axis.unit, AxisUnit::Months);
        assert_eq!(axis.label, "Months");
        assert_eq!(tick_months(&axis), vec![0, 6, 12, 18]);
        assert_eq!(tick_labels(&axis), vec!["0", "6", "12", "18"]);
    }

    #[test]
    fn tiny_payoff_still_shows_one_month_step() {
        assert_eq!(tick_months(&x_axis_ticks(2.0)), vec![0, 6]);
        assert_eq!(tick_months(&x_axis_ticks(0.0)), vec![0, 6]);
    }

    #[test]
    fn medium_payoff_ticks_every_year() {
        let axis = x_axis_ticks(60.0);
        assert_eq!(axis.unit, AxisUnit::Years);
        assert_eq!(tick_labels(&axis), vec!["0", "1", "2", "3", "4", "5"]);
        assert_eq!(tick_months(&axis), vec![0, 12, 24, 36, 48, 60]);
    }

    #[test]
    fn long_payoff_ticks_subset_of_years_ending_on_final_year() {
        // 110 months -> 10 years, step ceil(10 / 4) = 3
        let axis = x_axis_ticks(110.0);
        assert_eq!(tick_labels(&axis), vec!["0", "3", "6", "9", "10"]);

        // 96 months -> 8 years, step 2 lands on the final year already
        let axis = x_axis_ticks(96.0);
        assert_eq!(tick_labels(&axis), vec!["0", "2", "4", "6", "8"]);
    }

    #[test]
    fn format_short_uses_compact_suffixes() {
        assert_eq!(format_short(0.0), "$0");
        assert_eq!(format_short(250.0), "$250");
        assert_eq!(format_short(12.5), "$12.5");
        assert_eq!(format_short(1_000.0), "$1k");
        assert_eq!(format_short(2_500.0), "$3k");
        assert_eq!(format_short(20_000.0), "$20k");
        assert_eq!(format_short(1_000_000.0), "$1M");
        assert_eq!(format_short(1_250_000.0), "$1.3M");
        assert_eq!(format_short(3_000_000.0), "$3M");
    }

    #[test]
    fn format_short_rounds_millions_from_the_stored_value() {
        // 1.45 is stored just below the midpoint, 2.35 just above it.
        assert_eq!(format_short(1_450_000.0), "$1.4M");
        assert_eq!(format_short(2_350_000.0), "$2.4M");
        assert_eq!(format_short(9_960_000.0), "$10.0M");
        assert_eq!(format_short(-1_250_000.0), "$-1.3M");
    }

    #[test]
    fn to_fixed_follows_exact_binary_value() {
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(0.125, 2), "0.13");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(99.995, 2), "100.00");
        assert_eq!(to_fixed(-0.125, 2), "-0.13");
        assert_eq!(to_fixed(6.0, 2), "6.00");
    }

    #[test]
    fn format_duration_covers_each_shape() {
        assert_eq!(format_duration(0), "0 months");
        assert_eq!(format_duration(7), "7 months");
        assert_eq!(format_duration(24), "2y (24 mo)");
        assert_eq!(format_duration(100), "8y 4m (100 mo)");
    }

    #[test]
    fn format_currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.4), "$999");
        assert_eq!(format_currency(20_000.0), "$20,000");
        assert_eq!(format_currency(1_234_567.5), "$1,234,568");
        assert_eq!(format_currency(-4_321.0), "-$4,321");
    }

    #[test]
    fn balance_chart_maps_series_into_frame() {
        let params = LoanParameters::default();
        let result = project(&params);
        let frame = ChartFrame::default();
        let chart = balance_chart(&result, params.principal, &frame);

        let path = chart.path.as_deref().expect("path for non-empty schedule");
        assert!(path.starts_with("M 6.00 6.00"));
        assert!(path.contains(" L "));
        // Last point sits at the right edge on the x axis.
        assert!(path.ends_with("L 178.00 94.00"));

        let first_tick = &chart.y_ticks[0];
        assert_approx(first_tick.value, 0.0);
        assert_approx(first_tick.position, 94.0);
        assert_eq!(first_tick.label, "$0");
        assert_eq!(chart.y_ticks.last().map(|t| t.label.as_str()), Some("$20k"));

        assert_eq!(chart.x_axis_label, "Years");
        assert_approx(chart.x_ticks[0].position, 6.0);
    }

    #[test]
    fn balance_chart_without_schedule_has_no_path() {
        let chart = balance_chart(
            &ProjectionResult::payment_too_small(),
            20_000.0,
            &ChartFrame::editing(),
        );
        assert!(chart.points.is_empty());
        assert!(chart.path.is_none());
        assert!(chart.y_ticks.is_empty());
        assert!(chart.x_ticks.is_empty());
        assert_eq!(chart.frame.height, 84.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(128))]

        #[test]
        fn prop_nice_ticks_start_at_zero_and_cover_max(max_y in 1u64..10_000_000_000u64) {
            let max_y = max_y as f64;
            let ticks = nice_y_ticks(max_y, DEFAULT_Y_TICK_COUNT);
            prop_assert_eq!(ticks[0], 0.0);
            prop_assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(*ticks.last().expect("non-empty ticks") >= max_y);
            prop_assert!(ticks.len() <= DEFAULT_Y_TICK_COUNT as usize + 1);
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(128))]

        #[test]
        fn prop_downsample_is_bounded_and_anchored(
            months in 1u32..6_000,
            principal in 1u32..1_000_000
        ) {
            let points = downsample(&flat_schedule(months), principal as f64, MAX_PLOT_POINTS);
            prop_assert!(points.len() <= MAX_PLOT_POINTS + 1);
            prop_assert_eq!(points[0], PlotPoint { x: 0.0, y: principal as f64 });
            prop_assert!(points.windows(2).all(|w| w[0].x < w[1].x));
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(128))]

        #[test]
        fn prop_time_axis_starts_at_zero_and_reaches_end(final_month in 1u32..6_000) {
            let axis = x_axis_ticks(final_month as f64);
            let months = tick_months(&axis);
            prop_assert_eq!(months[0], 0);
            prop_assert!(months.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(*months.last().expect("non-empty axis") >= final_month);
        }
    }
}
