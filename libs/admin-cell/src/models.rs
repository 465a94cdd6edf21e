use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_database::{Filter, OrderBy, Search};
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_models::{Appointment, Doctor, Entity, Room, User};

// ==============================================================================
// REGISTRATION CONFIGURATION
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Doctor,
    User,
    Room,
    Appointment,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Doctor,
        ModelKind::User,
        ModelKind::Room,
        ModelKind::Appointment,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ModelKind::Doctor => "doctor",
            ModelKind::User => "user",
            ModelKind::Room => "room",
            ModelKind::Appointment => "appointment",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            ModelKind::Doctor => Doctor::TABLE,
            ModelKind::User => User::TABLE,
            ModelKind::Room => Room::TABLE,
            ModelKind::Appointment => Appointment::TABLE,
        }
    }

    pub fn verbose_name_plural(self) -> &'static str {
        match self {
            ModelKind::Doctor => "Doctors",
            ModelKind::User => "Users",
            ModelKind::Room => "Rooms",
            ModelKind::Appointment => "Appointments",
        }
    }
}

impl FromStr for ModelKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| AppError::NotFound(format!("No admin registered for model '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListColumn {
    /// A stored column, shown as-is.
    Field(&'static str),
    /// A derived label with no backing column.
    Computed { name: &'static str, label: &'static str },
}

impl ListColumn {
    pub fn name(&self) -> &'static str {
        match self {
            ListColumn::Field(name) | ListColumn::Computed { name, .. } => name,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ListColumn::Field(name) => humanize(name),
            ListColumn::Computed { label, .. } => label.to_string(),
        }
    }

    pub fn is_sortable(&self) -> bool {
        matches!(self, ListColumn::Field(_))
    }
}

fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Exact match against the distinct values present in the table.
    Choices,
    Boolean,
    /// Relative date ranges, see [`DatePreset`].
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter {
    pub field: &'static str,
    pub kind: FilterKind,
}

impl ListFilter {
    pub const fn choices(field: &'static str) -> Self {
        Self { field, kind: FilterKind::Choices }
    }

    pub const fn boolean(field: &'static str) -> Self {
        Self { field, kind: FilterKind::Boolean }
    }

    pub const fn date(field: &'static str) -> Self {
        Self { field, kind: FilterKind::Date }
    }

    pub fn to_filters(&self, value: &str, today: NaiveDate) -> Result<Vec<Filter>, AppError> {
        match self.kind {
            FilterKind::Choices => Ok(vec![Filter::eq(self.field, value)]),
            FilterKind::Boolean => match value {
                "true" | "1" => Ok(vec![Filter::eq(self.field, true)]),
                "false" | "0" => Ok(vec![Filter::eq(self.field, false)]),
                other => Err(AppError::BadRequest(format!(
                    "Invalid value '{}' for boolean filter '{}'", other, self.field
                ))),
            },
            FilterKind::Date => {
                let preset = DatePreset::from_slug(value).ok_or_else(|| {
                    AppError::BadRequest(format!("Invalid date filter '{}' for '{}'", value, self.field))
                })?;
                let (start, end) = preset.range(today);
                Ok(range_filters(self.field, start, end))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    Today,
    Past7Days,
    ThisMonth,
    ThisYear,
}

impl DatePreset {
    pub const ALL: [DatePreset; 4] = [
        DatePreset::Today,
        DatePreset::Past7Days,
        DatePreset::ThisMonth,
        DatePreset::ThisYear,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            DatePreset::Today => "today",
            DatePreset::Past7Days => "past_7_days",
            DatePreset::ThisMonth => "this_month",
            DatePreset::ThisYear => "this_year",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        DatePreset::ALL.into_iter().find(|preset| preset.slug() == slug)
    }

    /// Half-open `[start, end)` range in UTC.
    pub fn range(self, today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let tomorrow = today + Duration::days(1);
        let (start, end) = match self {
            DatePreset::Today => (today, tomorrow),
            DatePreset::Past7Days => (today - Duration::days(7), tomorrow),
            DatePreset::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                (first, next_month(first))
            }
            DatePreset::ThisYear => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let next = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(tomorrow);
                (first, next)
            }
        };
        (midnight(start), midnight(end))
    }
}

pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn next_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first)
}

pub fn range_filters(field: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Filter> {
    vec![
        Filter::gte(field, start.to_rfc3339_opts(SecondsFormat::Secs, true)),
        Filter::lt(field, end.to_rfc3339_opts(SecondsFormat::Secs, true)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub view: bool,
    pub add: bool,
    pub change: bool,
    pub delete: bool,
}

/// Read-only registration of one model on the admin site.
#[derive(Debug, Clone)]
pub struct ModelAdmin {
    pub kind: ModelKind,
    pub list_display: &'static [ListColumn],
    pub list_filter: &'static [ListFilter],
    pub search_fields: &'static [&'static str],
    pub readonly_fields: &'static [&'static str],
    pub ordering: &'static [&'static str],
    pub date_hierarchy: Option<&'static str>,
}

impl ModelAdmin {
    pub fn has_view_permission(&self, user: &AuthUser) -> bool {
        user.is_staff()
    }

    pub fn has_add_permission(&self, _user: &AuthUser) -> bool {
        false
    }

    // Records are owned by the scheduling write path.
    pub fn has_change_permission(&self, _user: &AuthUser, _obj: Option<&Value>) -> bool {
        false
    }

    pub fn has_delete_permission(&self, _user: &AuthUser, _obj: Option<&Value>) -> bool {
        false
    }

    pub fn permissions(&self, user: &AuthUser) -> Permissions {
        Permissions {
            view: self.has_view_permission(user),
            add: self.has_add_permission(user),
            change: self.has_change_permission(user, None),
            delete: self.has_delete_permission(user, None),
        }
    }

    pub fn default_ordering(&self) -> Vec<OrderBy> {
        self.ordering.iter().map(|spec| OrderBy::parse(spec)).collect()
    }

    pub fn is_sortable(&self, field: &str) -> bool {
        field == "id"
            || self
                .list_display
                .iter()
                .any(|column| column.is_sortable() && column.name() == field)
    }

    pub fn url(&self) -> String {
        format!("/admin/{}/", self.kind.slug())
    }
}

/// The site and its registrations.
#[derive(Debug, Clone)]
pub struct AdminSite {
    pub site_header: &'static str,
    pub site_title: &'static str,
    pub index_title: &'static str,
    pub registry: Vec<ModelAdmin>,
}

impl AdminSite {
    pub fn model_admin(&self, kind: ModelKind) -> Result<&ModelAdmin, AppError> {
        self.registry
            .iter()
            .find(|admin| admin.kind == kind)
            .ok_or_else(|| AppError::NotFound(format!("Model '{}' is not registered", kind.slug())))
    }
}

// ==============================================================================
// CHANGE LIST REQUESTS
// ==============================================================================

pub const SEARCH_PARAM: &str = "q";
pub const ORDER_PARAM: &str = "o";
pub const PAGE_PARAM: &str = "p";

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeListRequest {
    pub filters: Vec<Filter>,
    pub search: Option<Search>,
    pub search_text: Option<String>,
    pub order: Vec<OrderBy>,
    pub page: usize,
}

#[derive(Debug, Default)]
struct DateDrilldown {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
}

impl DateDrilldown {
    fn range(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, AppError> {
        let invalid = || AppError::BadRequest("Invalid date hierarchy selection".to_string());

        let (start, end) = match (self.year, self.month, self.day) {
            (None, None, None) => return Ok(None),
            (Some(year), None, None) => {
                let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
                let end = NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or_else(invalid)?;
                (start, end)
            }
            (Some(year), Some(month), None) => {
                let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
                (start, next_month(start))
            }
            (Some(year), Some(month), Some(day)) => {
                let start = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
                (start, start + Duration::days(1))
            }
            _ => return Err(invalid()),
        };
        Ok(Some((midnight(start), midnight(end))))
    }
}

impl ChangeListRequest {
    /// Validates list parameters against the registration; anything the
    /// registration does not declare is rejected.
    pub fn parse(
        admin: &ModelAdmin,
        params: &BTreeMap<String, String>,
        today: NaiveDate,
    ) -> Result<Self, AppError> {
        let mut request = Self {
            filters: Vec::new(),
            search: None,
            search_text: None,
            order: admin.default_ordering(),
            page: 0,
        };
        let mut drilldown = DateDrilldown::default();

        for (key, value) in params {
            match key.as_str() {
                SEARCH_PARAM => {
                    if admin.search_fields.is_empty() {
                        return Err(AppError::BadRequest(format!(
                            "{} cannot be searched", admin.kind.verbose_name_plural()
                        )));
                    }
                    request.search = Search::new(value, admin.search_fields);
                    request.search_text = request.search.as_ref().map(|_| value.trim().to_string());
                }
                ORDER_PARAM => request.order = parse_ordering(admin, value)?,
                PAGE_PARAM => {
                    request.page = value
                        .parse()
                        .map_err(|_| AppError::BadRequest(format!("Invalid page '{}'", value)))?;
                }
                other => {
                    if let Some(list_filter) = admin.list_filter.iter().find(|f| f.field == other) {
                        request.filters.extend(list_filter.to_filters(value, today)?);
                    } else if let Some(part) = drilldown_part(admin, other) {
                        let parse_error =
                            || AppError::BadRequest(format!("Invalid value '{}' for '{}'", value, other));
                        match part {
                            "year" => drilldown.year = Some(value.parse().map_err(|_| parse_error())?),
                            "month" => drilldown.month = Some(value.parse().map_err(|_| parse_error())?),
                            _ => drilldown.day = Some(value.parse().map_err(|_| parse_error())?),
                        }
                    } else {
                        return Err(AppError::BadRequest(format!("Unknown parameter '{}'", other)));
                    }
                }
            }
        }

        if let (Some(field), Some((start, end))) = (admin.date_hierarchy, drilldown.range()?) {
            request.filters.extend(range_filters(field, start, end));
        }

        Ok(request)
    }
}

fn drilldown_part(admin: &ModelAdmin, param: &str) -> Option<&'static str> {
    let field = admin.date_hierarchy?;
    let suffix = param.strip_prefix(field)?.strip_prefix("__")?;
    ["year", "month", "day"].into_iter().find(|part| *part == suffix)
}

fn parse_ordering(admin: &ModelAdmin, value: &str) -> Result<Vec<OrderBy>, AppError> {
    value
        .split(',')
        .filter(|spec| !spec.is_empty())
        .map(|spec| {
            let order = OrderBy::parse(spec);
            if admin.is_sortable(&order.column) {
                Ok(order)
            } else {
                Err(AppError::BadRequest(format!("Cannot order by '{}'", order.column)))
            }
        })
        .collect()
}

// ==============================================================================
// RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub verbose_name_plural: String,
    pub url: String,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteIndex {
    pub site_header: String,
    pub site_title: String,
    pub index_title: String,
    pub models: Vec<ModelSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnHeader {
    pub field: String,
    pub label: String,
    pub sortable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeListRow {
    pub id: Uuid,
    pub display: String,
    /// One value per column, in column order.
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterChoices {
    pub field: String,
    pub kind: FilterKind,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeList {
    pub model: String,
    pub verbose_name_plural: String,
    pub columns: Vec<ColumnHeader>,
    pub rows: Vec<ChangeListRow>,
    pub result_count: u64,
    pub full_result_count: u64,
    pub page: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub filters: Vec<FilterChoices>,
    pub search_fields: Vec<String>,
    pub search: Option<String>,
    pub ordering: Vec<String>,
    pub date_hierarchy: Option<String>,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectDetail {
    pub model: String,
    pub id: Uuid,
    pub display: String,
    pub fields: Value,
    pub readonly_fields: Vec<String>,
    pub permissions: Permissions,
}
