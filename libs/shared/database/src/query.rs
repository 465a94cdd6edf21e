use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq(Value),
    In(Vec<Value>),
    Gte(Value),
    Lt(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self { column: column.to_string(), op: FilterOp::Eq(value.into()) }
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Self { column: column.to_string(), op: FilterOp::Gte(value.into()) }
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self { column: column.to_string(), op: FilterOp::Lt(value.into()) }
    }

    pub fn in_ids<I>(column: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = Uuid>,
    {
        let values = ids.into_iter().map(|id| Value::String(id.to_string())).collect();
        Self { column: column.to_string(), op: FilterOp::In(values) }
    }

    /// PostgREST `column=op.value` pair.
    pub fn to_postgrest(&self) -> (String, String) {
        let rendered = match &self.op {
            FilterOp::Eq(value) => format!("eq.{}", render_value(value)),
            FilterOp::Gte(value) => format!("gte.{}", render_value(value)),
            FilterOp::Lt(value) => format!("lt.{}", render_value(value)),
            FilterOp::In(values) => {
                let items: Vec<String> = values.iter().map(|v| quote(&render_value(v))).collect();
                format!("in.({})", items.join(","))
            }
        };
        (self.column.clone(), rendered)
    }
}

/// Free-text search: every term must match at least one of `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    pub terms: Vec<String>,
    pub columns: Vec<String>,
}

impl Search {
    pub fn new(text: &str, columns: &[&str]) -> Option<Self> {
        let terms: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if terms.is_empty() || columns.is_empty() {
            return None;
        }
        Some(Self {
            terms,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    pub fn to_postgrest(&self) -> (String, String) {
        let groups: Vec<String> = self
            .terms
            .iter()
            .map(|term| {
                let alternatives: Vec<String> = self
                    .columns
                    .iter()
                    .map(|column| format!("{}.ilike.{}", column, quote(&format!("*{}*", term))))
                    .collect();
                format!("or({})", alternatives.join(","))
            })
            .collect();
        ("and".to_string(), format!("({})", groups.join(",")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        Self { column: column.to_string(), descending: false }
    }

    pub fn desc(column: &str) -> Self {
        Self { column: column.to_string(), descending: true }
    }

    /// Parses `field` / `-field`.
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(column) => Self::desc(column),
            None => Self::asc(spec),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub search: Option<Search>,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub columns: Option<Vec<String>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn search(mut self, search: Option<Search>) -> Self {
        self.search = search;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Encoded PostgREST query string, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        let mut params: Vec<(String, String)> = Vec::new();

        if let Some(columns) = &self.columns {
            params.push(("select".to_string(), columns.join(",")));
        }
        params.extend(self.filters.iter().map(Filter::to_postgrest));
        if let Some(search) = &self.search {
            params.push(search.to_postgrest());
        }
        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.descending { "desc" } else { "asc" }))
                .collect();
            params.push(("order".to_string(), order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }

        encode_params(&params)
    }
}

pub fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

// Reserved characters inside PostgREST lists and logic trees need quoting.
fn quote(raw: &str) -> String {
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_filters_for_postgrest() {
        assert_eq!(
            Filter::eq("disabled", false).to_postgrest(),
            ("disabled".to_string(), "eq.false".to_string())
        );
        assert_eq!(
            Filter::gte("datetime", json!("2024-01-15T00:00:00Z")).to_postgrest().1,
            "gte.2024-01-15T00:00:00Z"
        );

        let id = Uuid::nil();
        assert_eq!(
            Filter::in_ids("id", [id]).to_postgrest().1,
            format!("in.(\"{}\")", id)
        );
    }

    #[test]
    fn search_requires_every_term() {
        let search = Search::new("john  card", &["name", "specialization"]).unwrap();
        assert_eq!(search.terms, vec!["john", "card"]);
        assert_eq!(
            search.to_postgrest().1,
            "(or(name.ilike.\"*john*\",specialization.ilike.\"*john*\"),\
or(name.ilike.\"*card*\",specialization.ilike.\"*card*\"))"
        );

        assert!(Search::new("   ", &["name"]).is_none());
        assert!(Search::new("john", &[]).is_none());
    }

    #[test]
    fn builds_encoded_query_string() {
        let query = Query::new()
            .columns(&["id", "specialization"])
            .filter(Filter::eq("role", "user"))
            .order_by(OrderBy::parse("surname"))
            .order_by(OrderBy::parse("-name"))
            .limit(10)
            .offset(20);

        assert_eq!(
            query.to_query_string(),
            "select=id%2Cspecialization&role=eq.user&order=surname.asc%2Cname.desc&limit=10&offset=20"
        );
    }
}
