mod chart;
mod engine;
mod payment;
mod plan;
mod settings;
mod types;

pub use chart::{
    AxisTick, AxisUnit, BalanceChart, ChartFrame, DEFAULT_Y_TICK_COUNT, MAX_PLOT_POINTS,
    PlotPoint, TimeAxis, TimeTick, ValueTick, balance_chart, downsample, format_currency,
    format_duration, format_short, nice_y_ticks, x_axis_ticks,
};
pub use engine::{
    MAX_SCHEDULE_MONTHS, project, simulate_schedule, simulate_schedule_capped, summarize,
};
pub use payment::{monthly_rate, resolve_payment};
pub use plan::{Advice, PlanRequest, PlanResponse, generate_plan};
pub use settings::{
    JsonFileStore, MemoryStore, PersistedSettings, SETTINGS_KEY, SettingsEditor, SettingsError,
    SettingsStore,
};
pub use types::{
    LoanParameters, ProjectionFailure, ProjectionResult, ProjectionSummary, SchedulePoint,
};
