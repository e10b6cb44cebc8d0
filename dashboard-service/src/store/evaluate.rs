//! In-process evaluation of [`Stage`] values with MongoDB semantics.

use super::StoreError;
use crate::query::{Expr, Filter, SortOrder, Stage};
use bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::HashMap;

pub(crate) type Collections = HashMap<String, Vec<Document>>;

pub(crate) fn run(
    stages: &[Stage],
    input: Vec<Document>,
    collections: &Collections,
) -> Result<Vec<Document>, StoreError> {
    let mut current = input;
    for stage in stages {
        current = match stage {
            Stage::Join {
                from,
                local_field,
                foreign_field,
                as_field,
            } => join(current, collections, from, local_field, foreign_field, as_field),
            Stage::Unwind(path) => unwind(current, path),
            Stage::DeriveFields(fields) => derive(current, fields)?,
            Stage::Filter(filter) => current
                .into_iter()
                .filter(|doc| matches(doc, filter))
                .collect(),
            Stage::Sort(keys) => {
                sort(&mut current, keys);
                current
            }
            Stage::Skip(n) => current
                .into_iter()
                .skip(usize::try_from(*n).unwrap_or(usize::MAX))
                .collect(),
            Stage::Limit(n) => {
                if *n <= 0 {
                    return Err(StoreError::Rejected("$limit must be positive".into()));
                }
                current.into_iter().take(*n as usize).collect()
            }
            Stage::Project(fields) => project(current, fields)?,
            Stage::Count(field) => count(current, field),
            Stage::GroupSum(sums) => group_sum(current, sums)?,
        };
    }
    Ok(current)
}

pub(crate) fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_document()?.get(part)?;
    }
    Some(current)
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Canonical BSON type order used when sorting mixed types.
fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) | Some(Bson::Undefined) => 0,
        Some(Bson::Int32(_)) | Some(Bson::Int64(_)) | Some(Bson::Double(_)) => 1,
        Some(Bson::String(_)) | Some(Bson::Symbol(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::ObjectId(_)) => 6,
        Some(Bson::Boolean(_)) => 7,
        Some(Bson::DateTime(_)) => 8,
        Some(_) => 9,
    }
}

pub(crate) fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::Boolean(x)), Some(Bson::Boolean(y))) => x.cmp(y),
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => x.cmp(y),
        (Some(Bson::ObjectId(x)), Some(Bson::ObjectId(y))) => x.bytes().cmp(&y.bytes()),
        (Some(x), Some(y)) => match (as_f64(x), as_f64(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

fn stringify(value: Option<&Bson>) -> Bson {
    match value {
        Some(Bson::String(s)) => Bson::String(s.clone()),
        Some(Bson::Int32(n)) => Bson::String(n.to_string()),
        Some(Bson::Int64(n)) => Bson::String(n.to_string()),
        Some(Bson::Double(n)) if n.is_finite() && n.fract() == 0.0 => {
            Bson::String(format!("{}", *n as i64))
        }
        Some(Bson::Double(n)) => Bson::String(n.to_string()),
        Some(Bson::Boolean(b)) => Bson::String(b.to_string()),
        Some(Bson::ObjectId(oid)) => Bson::String(oid.to_hex()),
        Some(Bson::DateTime(dt)) => dt
            .try_to_rfc3339_string()
            .map(Bson::String)
            .unwrap_or(Bson::Null),
        _ => Bson::Null,
    }
}

/// Numeric `$sum` semantics: non-numeric values are ignored, integers stay
/// integers until a double appears.
#[derive(Default)]
struct Sum {
    int: i64,
    float: f64,
    is_float: bool,
}

impl Sum {
    fn add(&mut self, value: Option<&Bson>) {
        match value {
            Some(Bson::Int32(n)) => self.add_int(i64::from(*n)),
            Some(Bson::Int64(n)) => self.add_int(*n),
            Some(Bson::Double(n)) => {
                self.float += *n;
                self.is_float = true;
            }
            _ => {}
        }
    }

    /// Overflowing integers carry on as a double.
    fn add_int(&mut self, n: i64) {
        match self.int.checked_add(n) {
            Some(sum) => self.int = sum,
            None => {
                self.float += n as f64;
                self.is_float = true;
            }
        }
    }

    fn finish(self) -> Bson {
        if self.is_float {
            Bson::Double(self.float + self.int as f64)
        } else {
            Bson::Int64(self.int)
        }
    }
}

/// `None` means the expression refers to a missing field and the output
/// field is omitted.
fn eval(doc: &Document, expr: &Expr) -> Result<Option<Bson>, StoreError> {
    match expr {
        Expr::Field(path) => Ok(get_path(doc, path).cloned()),
        Expr::Stringify(path) => Ok(Some(stringify(get_path(doc, path)))),
        Expr::Size(path) => match get_path(doc, path) {
            Some(Bson::Array(items)) => Ok(Some(Bson::Int32(items.len() as i32))),
            _ => Err(StoreError::Rejected(format!(
                "The argument to $size must be an array: {}",
                path
            ))),
        },
        Expr::SumWhere {
            input,
            key,
            equals,
            value,
        } => {
            let mut sum = Sum::default();
            if let Some(Bson::Array(items)) = get_path(doc, input) {
                for item in items.iter().filter_map(Bson::as_document) {
                    let hit = get_path(item, key).is_some_and(|v| values_equal(v, equals));
                    if hit {
                        sum.add(get_path(item, value));
                    }
                }
            }
            Ok(Some(sum.finish()))
        }
        Expr::IfEquals {
            field,
            equals,
            then,
        } => {
            let hit = get_path(doc, field).is_some_and(|v| values_equal(v, equals));
            if hit {
                Ok(Some(get_path(doc, then).cloned().unwrap_or(Bson::Null)))
            } else {
                Ok(Some(Bson::Int32(0)))
            }
        }
    }
}

fn join(
    docs: Vec<Document>,
    collections: &Collections,
    from: &str,
    local_field: &str,
    foreign_field: &str,
    as_field: &str,
) -> Vec<Document> {
    let foreign = collections.get(from).map(Vec::as_slice).unwrap_or_default();
    docs.into_iter()
        .map(|mut doc| {
            let local = get_path(&doc, local_field).cloned().unwrap_or(Bson::Null);
            let matched: Vec<Bson> = foreign
                .iter()
                .filter(|other| {
                    let value = get_path(other, foreign_field).unwrap_or(&Bson::Null);
                    values_equal(value, &local)
                })
                .cloned()
                .map(Bson::Document)
                .collect();
            doc.insert(as_field, Bson::Array(matched));
            doc
        })
        .collect()
}

fn unwind(docs: Vec<Document>, path: &str) -> Vec<Document> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match doc.get(path) {
            Some(Bson::Array(items)) => {
                for item in items.clone() {
                    let mut row = doc.clone();
                    row.insert(path, item);
                    out.push(row);
                }
            }
            None | Some(Bson::Null) => {}
            Some(_) => out.push(doc),
        }
    }
    out
}

fn derive(docs: Vec<Document>, fields: &[(String, Expr)]) -> Result<Vec<Document>, StoreError> {
    docs.into_iter()
        .map(|mut doc| -> Result<Document, StoreError> {
            let mut derived = Vec::with_capacity(fields.len());
            for (name, expr) in fields {
                derived.push((name, eval(&doc, expr)?));
            }
            for (name, value) in derived {
                match value {
                    Some(value) => {
                        doc.insert(name.as_str(), value);
                    }
                    None => {
                        doc.remove(name);
                    }
                }
            }
            Ok(doc)
        })
        .collect()
}

fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::AnyMatches { fields, pattern } => fields.iter().any(|field| {
            match get_path(doc, field) {
                Some(Bson::String(s)) => pattern.is_match(s),
                Some(Bson::Array(items)) => items
                    .iter()
                    .any(|item| matches!(item, Bson::String(s) if pattern.is_match(s))),
                _ => false,
            }
        }),
    }
}

fn sort(docs: &mut [Document], keys: &[(String, SortOrder)]) {
    docs.sort_by(|a, b| {
        for (field, order) in keys {
            let ordering = compare(get_path(a, field), get_path(b, field));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn project(docs: Vec<Document>, fields: &[(String, Expr)]) -> Result<Vec<Document>, StoreError> {
    docs.into_iter()
        .map(|doc| -> Result<Document, StoreError> {
            let mut out = Document::new();
            if let Some(id) = doc.get("_id") {
                out.insert("_id", id.clone());
            }
            for (name, expr) in fields {
                if let Some(value) = eval(&doc, expr)? {
                    out.insert(name.as_str(), value);
                }
            }
            Ok(out)
        })
        .collect()
}

fn count(docs: Vec<Document>, field: &str) -> Vec<Document> {
    if docs.is_empty() {
        return Vec::new();
    }
    let mut out = Document::new();
    out.insert(field, Bson::Int32(docs.len() as i32));
    vec![out]
}

fn group_sum(docs: Vec<Document>, sums: &[(String, Expr)]) -> Result<Vec<Document>, StoreError> {
    if docs.is_empty() {
        return Ok(Vec::new());
    }
    let mut out = Document::new();
    out.insert("_id", Bson::Null);
    for (name, expr) in sums {
        let mut sum = Sum::default();
        for doc in &docs {
            sum.add(eval(doc, expr)?.as_ref());
        }
        out.insert(name.as_str(), sum.finish());
    }
    Ok(vec![out])
}
