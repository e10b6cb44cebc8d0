//! Pipeline assembly for the fixed set of dashboard query shapes.
//!
//! Every builder is a pure function of its inputs. The invoice list and the
//! invoice count share [`invoice_search_prefix`], so both operate on the same
//! filtered row set and page counts agree with the paginated list.

use super::pattern::SearchPattern;
use super::stage::{Expr, Filter, SortOrder, Stage};
use bson::{Bson, Document};

pub const INVOICES: &str = "invoices";
pub const CUSTOMERS: &str = "customers";
pub const REVENUE: &str = "revenue";

/// Rows per page of the invoices table.
pub const ITEMS_PER_PAGE: u64 = 6;

/// Rows on the "latest invoices" card.
pub const LATEST_INVOICES_LIMIT: i64 = 5;

/// Field holding the result of the invoice count stage.
pub const COUNT_FIELD: &str = "count";

/// Fields the invoice search matches against, after the customer join and
/// the derived string fields.
pub const INVOICE_SEARCH_FIELDS: &[&str] = &[
    "customer.name",
    "customer.email",
    "status",
    "amountString",
    "dateString",
];

pub const CUSTOMER_SEARCH_FIELDS: &[&str] = &["name", "email"];

/// Skip/limit window over a filtered, sorted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
}

impl Pagination {
    /// Pages are 1-based; anything below 1 is read as the first page.
    pub fn page(page: i64) -> Self {
        Self {
            page: page.max(1) as u64,
        }
    }

    pub fn number(&self) -> u64 {
        self.page
    }

    /// Saturates for pages far past any real result.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(ITEMS_PER_PAGE)
    }

    pub fn limit(&self) -> i64 {
        ITEMS_PER_PAGE as i64
    }
}

/// Number of pages needed to show `count` rows.
pub fn total_pages(count: u64) -> u64 {
    count.div_ceil(ITEMS_PER_PAGE)
}

/// Query shapes supported by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineKind {
    InvoiceList {
        pattern: Option<SearchPattern>,
        pagination: Pagination,
    },
    InvoiceCount {
        pattern: Option<SearchPattern>,
    },
    CustomerRollup {
        pattern: Option<SearchPattern>,
    },
    LatestInvoices,
    StatusTotals,
}

impl PipelineKind {
    pub fn base_collection(&self) -> &'static str {
        match self {
            PipelineKind::CustomerRollup { .. } => CUSTOMERS,
            _ => INVOICES,
        }
    }
}

/// Ordered stages bound to the collection they run against.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    collection: &'static str,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn build(kind: &PipelineKind) -> Self {
        let stages = match kind {
            PipelineKind::InvoiceList {
                pattern,
                pagination,
            } => invoice_list(pattern.as_ref(), *pagination),
            PipelineKind::InvoiceCount { pattern } => invoice_count(pattern.as_ref()),
            PipelineKind::CustomerRollup { pattern } => customer_rollup(pattern.as_ref()),
            PipelineKind::LatestInvoices => latest_invoices(),
            PipelineKind::StatusTotals => status_totals(),
        };

        Self {
            collection: kind.base_collection(),
            stages,
        }
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// MongoDB aggregation syntax, one document per stage.
    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }
}

fn join_customer() -> [Stage; 2] {
    [
        Stage::Join {
            from: CUSTOMERS.to_string(),
            local_field: "customer_id".to_string(),
            foreign_field: "id".to_string(),
            as_field: "customer".to_string(),
        },
        Stage::Unwind("customer".to_string()),
    ]
}

/// String shadows of non-string fields so one text pattern can match them.
fn searchable_fields() -> Stage {
    Stage::DeriveFields(vec![
        ("amountString".to_string(), Expr::Stringify("amount".to_string())),
        ("dateString".to_string(), Expr::Stringify("date".to_string())),
    ])
}

fn search_filter(pattern: &SearchPattern, fields: &[&str]) -> Stage {
    Stage::Filter(Filter::AnyMatches {
        fields: fields.iter().map(|f| f.to_string()).collect(),
        pattern: pattern.clone(),
    })
}

/// Join, derive and optional filter stages shared by list and count.
pub fn invoice_search_prefix(pattern: Option<&SearchPattern>) -> Vec<Stage> {
    let mut stages = Vec::from(join_customer());
    stages.push(searchable_fields());
    if let Some(pattern) = pattern {
        stages.push(search_filter(pattern, INVOICE_SEARCH_FIELDS));
    }
    stages
}

/// Date descending, `id` breaking ties so separate page queries agree on order.
fn newest_first() -> Stage {
    Stage::Sort(vec![
        ("date".to_string(), SortOrder::Descending),
        ("id".to_string(), SortOrder::Ascending),
    ])
}

fn invoice_list(pattern: Option<&SearchPattern>, pagination: Pagination) -> Vec<Stage> {
    let mut stages = invoice_search_prefix(pattern);
    stages.extend([
        newest_first(),
        Stage::Skip(pagination.offset()),
        Stage::Limit(pagination.limit()),
        Stage::Project(vec![
            ("id".to_string(), Expr::field("id")),
            ("amount".to_string(), Expr::field("amount")),
            ("date".to_string(), Expr::field("date")),
            ("status".to_string(), Expr::field("status")),
            ("name".to_string(), Expr::field("customer.name")),
            ("email".to_string(), Expr::field("customer.email")),
            ("image_url".to_string(), Expr::field("customer.image_url")),
            ("customer_id".to_string(), Expr::field("customer.id")),
        ]),
    ]);
    stages
}

fn invoice_count(pattern: Option<&SearchPattern>) -> Vec<Stage> {
    let mut stages = invoice_search_prefix(pattern);
    stages.push(Stage::Count(COUNT_FIELD.to_string()));
    stages
}

fn sum_by_status(status: &str) -> Expr {
    Expr::SumWhere {
        input: "invoices".to_string(),
        key: "status".to_string(),
        equals: Bson::String(status.to_string()),
        value: "amount".to_string(),
    }
}

fn customer_rollup(pattern: Option<&SearchPattern>) -> Vec<Stage> {
    let mut stages = vec![
        Stage::Join {
            from: INVOICES.to_string(),
            local_field: "id".to_string(),
            foreign_field: "customer_id".to_string(),
            as_field: "invoices".to_string(),
        },
        Stage::Project(vec![
            ("id".to_string(), Expr::field("id")),
            ("name".to_string(), Expr::field("name")),
            ("email".to_string(), Expr::field("email")),
            ("image_url".to_string(), Expr::field("image_url")),
            ("total_invoices".to_string(), Expr::Size("invoices".to_string())),
            ("total_pending".to_string(), sum_by_status("pending")),
            ("total_paid".to_string(), sum_by_status("paid")),
        ]),
    ];
    if let Some(pattern) = pattern {
        stages.push(search_filter(pattern, CUSTOMER_SEARCH_FIELDS));
    }
    stages.push(Stage::Sort(vec![("name".to_string(), SortOrder::Ascending)]));
    stages
}

fn latest_invoices() -> Vec<Stage> {
    let mut stages = Vec::from(join_customer());
    stages.extend([
        newest_first(),
        Stage::Limit(LATEST_INVOICES_LIMIT),
        Stage::Project(vec![
            ("id".to_string(), Expr::field("id")),
            ("amount".to_string(), Expr::field("amount")),
            ("name".to_string(), Expr::field("customer.name")),
            ("image_url".to_string(), Expr::field("customer.image_url")),
            ("email".to_string(), Expr::field("customer.email")),
        ]),
    ]);
    stages
}

fn status_total(status: &str) -> Expr {
    Expr::IfEquals {
        field: "status".to_string(),
        equals: Bson::String(status.to_string()),
        then: "amount".to_string(),
    }
}

fn status_totals() -> Vec<Stage> {
    vec![Stage::GroupSum(vec![
        ("paid".to_string(), status_total("paid")),
        ("pending".to_string(), status_total("pending")),
    ])]
}
