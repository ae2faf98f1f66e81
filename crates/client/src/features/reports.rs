//! Savings report and KPI summary.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use axentia_core::{DomainError, validate};

use crate::context::AppContext;
use crate::endpoint::LogicalPath;
use crate::error::ClientResult;
use crate::lenient;
use crate::request::action;
use crate::response::Fetched;

/// Average hourly cost used to value saved time.
pub const HOURLY_RATE_EUR: f64 = 25.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "365d")]
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "24h",
            Period::Week => "7d",
            Period::Month => "30d",
            Period::Quarter => "90d",
            Period::Year => "365d",
        }
    }
}

impl FromStr for Period {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !validate::period(s) {
            return Err(DomainError::validation(format!("unsupported period '{s}'")));
        }
        Ok(match s {
            "24h" => Period::Day,
            "7d" => Period::Week,
            "90d" => Period::Quarter,
            "365d" => Period::Year,
            _ => Period::Month,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(default, deserialize_with = "lenient::string")]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub area: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub total_minutes: i64,
    #[serde(default, deserialize_with = "lenient::int")]
    pub total_executions: i64,
}

impl ReportRow {
    pub fn hours(&self) -> f64 {
        round1(self.total_minutes as f64 / 60.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    pub hours_saved: f64,
    pub executions: i64,
    pub roi_eur: f64,
}

impl KpiSummary {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a ReportRow>) -> Self {
        let (minutes, executions) = rows
            .into_iter()
            .fold((0i64, 0i64), |(m, e), row| (m + row.total_minutes, e + row.total_executions));
        let hours_saved = round1(minutes as f64 / 60.0);
        Self {
            hours_saved,
            executions,
            roi_eur: hours_saved * HOURLY_RATE_EUR,
        }
    }
}

/// Distinct non-blank areas (case-insensitive, first spelling wins), sorted.
pub fn area_options(rows: &[ReportRow]) -> Vec<String> {
    let mut seen = std::collections::BTreeMap::new();
    for row in rows {
        let area = row.area.trim();
        if !area.is_empty() {
            seen.entry(area.to_lowercase()).or_insert_with(|| area.to_string());
        }
    }
    let mut options: Vec<String> = seen.into_values().collect();
    options.sort();
    options
}

/// Search and area filter shared by the report, KPI and workflow views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub search: String,
    pub area: String,
}

impl ReportFilter {
    pub fn is_active(&self) -> bool {
        !self.search.is_empty() || !self.area.trim().is_empty()
    }

    pub fn matches(&self, display_name: &str, area: &str) -> bool {
        let search = self.search.to_lowercase();
        let wanted = self.area.trim().to_lowercase();
        display_name.to_lowercase().contains(&search) && (wanted.is_empty() || area.trim().to_lowercase() == wanted)
    }

    pub fn apply<'a>(&self, rows: &'a [ReportRow]) -> Vec<&'a ReportRow> {
        rows.iter().filter(|row| self.matches(&row.display_name, &row.area)).collect()
    }
}

pub struct Reports {
    ctx: AppContext,
}

impl Reports {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn load(&self, period: Period) -> ClientResult<Fetched<Vec<ReportRow>>> {
        let mut body = action("get_report");
        body.insert("period".into(), Value::String(period.as_str().into()));

        let url = self.ctx.endpoint(LogicalPath::DashboardApi);
        let rows = self.ctx.requester().load::<Vec<ReportRow>>(&url, body).await?;
        Ok(rows.non_empty())
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
