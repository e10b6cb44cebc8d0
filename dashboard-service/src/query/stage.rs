//! Aggregation stages as tagged values.
//!
//! Stages are plain data. [`Stage::to_document`] renders a stage into the
//! MongoDB aggregation syntax; the in-memory store interprets the same values
//! directly.

use super::pattern::SearchPattern;
use bson::{doc, Bson, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn direction(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// Value expression used by derive, project and group stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Value at a dotted path.
    Field(String),
    /// String form of the value at a path (`$toString`).
    Stringify(String),
    /// Length of the array at a path (`$size`).
    Size(String),
    /// Sum of `value` over the elements of the `input` array whose `key`
    /// equals `equals`.
    SumWhere {
        input: String,
        key: String,
        equals: Bson,
        value: String,
    },
    /// `then` when `field` equals `equals`, otherwise 0. Used inside group sums.
    IfEquals {
        field: String,
        equals: Bson,
        then: String,
    },
}

impl Expr {
    pub fn field(path: &str) -> Self {
        Expr::Field(path.to_string())
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            Expr::Field(path) => Bson::String(format!("${}", path)),
            Expr::Stringify(path) => Bson::Document(doc! { "$toString": format!("${}", path) }),
            Expr::Size(path) => Bson::Document(doc! { "$size": format!("${}", path) }),
            Expr::SumWhere {
                input,
                key,
                equals,
                value,
            } => Bson::Document(doc! {
                "$sum": {
                    "$map": {
                        "input": {
                            "$filter": {
                                "input": format!("${}", input),
                                "as": "item",
                                "cond": { "$eq": [format!("$$item.{}", key), equals.clone()] },
                            }
                        },
                        "as": "item",
                        "in": format!("$$item.{}", value),
                    }
                }
            }),
            Expr::IfEquals {
                field,
                equals,
                then,
            } => Bson::Document(doc! {
                "$cond": [
                    { "$eq": [format!("${}", field), equals.clone()] },
                    format!("${}", then),
                    0,
                ]
            }),
        }
    }
}

/// Row predicate of a filter stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// The pattern matches at least one of the string fields.
    AnyMatches {
        fields: Vec<String>,
        pattern: SearchPattern,
    },
}

impl Filter {
    pub fn to_document(&self) -> Document {
        match self {
            Filter::AnyMatches { fields, pattern } => {
                let regex = pattern.to_bson();
                let clauses: Vec<Bson> = fields
                    .iter()
                    .map(|field| {
                        let mut clause = Document::new();
                        clause.insert(field.as_str(), Bson::RegularExpression(regex.clone()));
                        Bson::Document(clause)
                    })
                    .collect();
                doc! { "$or": clauses }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Attach the documents of `from` whose `foreign_field` equals this
    /// document's `local_field`, as an array under `as_field`.
    Join {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    /// One output document per element of the array at the path. Documents
    /// whose array is empty or missing are dropped.
    Unwind(String),
    DeriveFields(Vec<(String, Expr)>),
    Filter(Filter),
    Sort(Vec<(String, SortOrder)>),
    Skip(u64),
    Limit(i64),
    Project(Vec<(String, Expr)>),
    /// Replace the input with a single `{ <field>: n }` document, or nothing
    /// when the input is empty.
    Count(String),
    /// Collapse the input into one document of sums (`_id: null`).
    GroupSum(Vec<(String, Expr)>),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Join { .. } => "$lookup",
            Stage::Unwind(_) => "$unwind",
            Stage::DeriveFields(_) => "$addFields",
            Stage::Filter(_) => "$match",
            Stage::Sort(_) => "$sort",
            Stage::Skip(_) => "$skip",
            Stage::Limit(_) => "$limit",
            Stage::Project(_) => "$project",
            Stage::Count(_) => "$count",
            Stage::GroupSum(_) => "$group",
        }
    }

    pub fn to_document(&self) -> Document {
        let body = match self {
            Stage::Join {
                from,
                local_field,
                foreign_field,
                as_field,
            } => Bson::Document(doc! {
                "from": from.as_str(),
                "localField": local_field.as_str(),
                "foreignField": foreign_field.as_str(),
                "as": as_field.as_str(),
            }),
            Stage::Unwind(path) => Bson::String(format!("${}", path)),
            Stage::DeriveFields(fields) | Stage::Project(fields) => {
                Bson::Document(expressions(fields))
            }
            Stage::Filter(filter) => Bson::Document(filter.to_document()),
            Stage::Sort(keys) => {
                let mut sort = Document::new();
                for (field, order) in keys {
                    sort.insert(field.as_str(), order.direction());
                }
                Bson::Document(sort)
            }
            Stage::Skip(n) => Bson::Int64(i64::try_from(*n).unwrap_or(i64::MAX)),
            Stage::Limit(n) => Bson::Int64(*n),
            Stage::Count(field) => Bson::String(field.clone()),
            Stage::GroupSum(sums) => {
                let mut group = doc! { "_id": Bson::Null };
                for (name, expr) in sums {
                    group.insert(name.as_str(), doc! { "$sum": expr.to_bson() });
                }
                Bson::Document(group)
            }
        };

        let mut stage = Document::new();
        stage.insert(self.name(), body);
        stage
    }
}

fn expressions(fields: &[(String, Expr)]) -> Document {
    let mut out = Document::new();
    for (name, expr) in fields {
        out.insert(name.as_str(), expr.to_bson());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_document() {
        let stage = Stage::Join {
            from: "customers".into(),
            local_field: "customer_id".into(),
            foreign_field: "id".into(),
            as_field: "customer".into(),
        };
        assert_eq!(
            stage.to_document(),
            doc! {
                "$lookup": {
                    "from": "customers",
                    "localField": "customer_id",
                    "foreignField": "id",
                    "as": "customer",
                }
            }
        );
    }

    #[test]
    fn test_unwind_and_count_documents() {
        assert_eq!(
            Stage::Unwind("customer".into()).to_document(),
            doc! { "$unwind": "$customer" }
        );
        assert_eq!(
            Stage::Count("count".into()).to_document(),
            doc! { "$count": "count" }
        );
    }

    #[test]
    fn test_huge_skip_stays_positive() {
        assert_eq!(
            Stage::Skip(u64::MAX).to_document(),
            doc! { "$skip": i64::MAX }
        );
    }

    #[test]
    fn test_filter_document() {
        let pattern = SearchPattern::build("a.b").unwrap();
        let stage = Stage::Filter(Filter::AnyMatches {
            fields: vec!["name".into(), "email".into()],
            pattern: pattern.clone(),
        });
        let regex = Bson::RegularExpression(pattern.to_bson());
        assert_eq!(
            stage.to_document(),
            doc! { "$match": { "$or": [ { "name": regex.clone() }, { "email": regex } ] } }
        );
    }

    #[test]
    fn test_sort_keeps_key_order() {
        let stage = Stage::Sort(vec![
            ("date".into(), SortOrder::Descending),
            ("id".into(), SortOrder::Ascending),
        ]);
        let doc = stage.to_document();
        let sort = doc.get_document("$sort").unwrap();
        let keys: Vec<&str> = sort.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["date", "id"]);
        assert_eq!(sort.get_i32("date").unwrap(), -1);
    }

    #[test]
    fn test_sum_where_expression() {
        let expr = Expr::SumWhere {
            input: "invoices".into(),
            key: "status".into(),
            equals: Bson::String("paid".into()),
            value: "amount".into(),
        };
        let rendered = expr.to_bson();
        let sum = rendered.as_document().unwrap().get_document("$sum").unwrap();
        let map = sum.get_document("$map").unwrap();
        assert_eq!(map.get_str("in").unwrap(), "$$item.amount");
        let filter = map
            .get_document("input")
            .unwrap()
            .get_document("$filter")
            .unwrap();
        assert_eq!(filter.get_str("input").unwrap(), "$invoices");
    }

    #[test]
    fn test_group_sum_document() {
        let stage = Stage::GroupSum(vec![(
            "paid".into(),
            Expr::IfEquals {
                field: "status".into(),
                equals: Bson::String("paid".into()),
                then: "amount".into(),
            },
        )]);
        assert_eq!(
            stage.to_document(),
            doc! {
                "$group": {
                    "_id": Bson::Null,
                    "paid": { "$sum": { "$cond": [ { "$eq": ["$status", "paid"] }, "$amount", 0 ] } },
                }
            }
        );
    }
}
