//! Rendering of store queries into parameterized SQL.
//!
//! Every value that comes from a request is bound as a parameter. Table
//! names come from configuration and are quoted as identifiers.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use stac_search::{Direction, Field, Operator, Order, Predicate, Seek, StoreQuery, parse_rfc3339};
use std::collections::HashMap;
use tokio_postgres::types::ToSql;

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// `text`
    Text(String),

    /// `text[]`
    TextArray(Vec<String>),

    /// `timestamptz`
    Timestamp(DateTime<Utc>),

    /// `timestamptz[]`
    TimestampArray(Vec<DateTime<Utc>>),

    /// `jsonb`
    Json(Value),

    /// `double precision`
    Float(f64),

    /// `bigint`
    Int(i64),
}

/// A rendered statement and the values of its parameters, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sql {
    /// The SQL text, with `$n` placeholders.
    pub statement: String,

    /// The parameter values.
    pub params: Vec<BindValue>,
}

impl BindValue {
    /// Returns this value as something `tokio-postgres` can bind.
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            BindValue::Text(value) => value,
            BindValue::TextArray(value) => value,
            BindValue::Timestamp(value) => value,
            BindValue::TimestampArray(value) => value,
            BindValue::Json(value) => value,
            BindValue::Float(value) => value,
            BindValue::Int(value) => value,
        }
    }
}

impl Sql {
    /// Returns the parameters in the form `tokio-postgres` expects.
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(BindValue::as_sql).collect()
    }
}

/// Renders a search.
///
/// Filters and the seek position become the `WHERE` clause, the ordering
/// becomes `ORDER BY` with nulls sorting last ascending and first
/// descending, and the query's limit is bound to `LIMIT`.
///
/// # Examples
///
/// ```
/// use stac_search::{Config, Search, translate};
///
/// let config = Config::default();
/// let request = Search::new().limit(2).into_request(&config).unwrap();
/// let query = translate(&request, &config.extensions).unwrap();
/// let sql = stac_search_postgres::sql::search("items", &query).unwrap();
/// assert_eq!(
///     sql.statement,
///     r#"SELECT content FROM "items" ORDER BY datetime DESC NULLS FIRST, collection ASC NULLS LAST, id ASC NULLS LAST LIMIT $1"#
/// );
/// ```
pub fn search(table: &str, query: &StoreQuery) -> Result<Sql> {
    let mut builder = Builder::default();
    let mut wheres = Vec::with_capacity(query.filters.len() + 1);
    for predicate in &query.filters {
        wheres.push(builder.predicate(predicate)?);
    }
    if let Some(seek) = query.seek.as_ref() {
        wheres.push(builder.seek(&query.order, seek)?);
    }
    let mut statement = format!("SELECT content FROM {}", quote_identifier(table));
    if !wheres.is_empty() {
        statement.push_str(&format!(" WHERE {}", wheres.join(" AND ")));
    }
    if !query.order.is_empty() {
        let order_by = builder.order_by(&query.order);
        statement.push_str(&format!(" ORDER BY {order_by}"));
    }
    let limit = builder.bind(BindValue::Int(
        i64::try_from(query.limit).unwrap_or(i64::MAX),
    ));
    statement.push_str(&format!(" LIMIT {limit}"));
    Ok(Sql {
        statement,
        params: builder.params,
    })
}

/// Renders a lookup of one item in one collection.
pub fn item(table: &str, collection_id: &str, item_id: &str) -> Sql {
    Sql {
        statement: format!(
            "SELECT content FROM {} WHERE collection = $1 AND id = $2",
            quote_identifier(table)
        ),
        params: vec![
            BindValue::Text(collection_id.to_string()),
            BindValue::Text(item_id.to_string()),
        ],
    }
}

/// Renders a lookup of one collection.
pub fn collection(table: &str, id: &str) -> Sql {
    Sql {
        statement: format!(
            "SELECT content FROM {} WHERE id = $1",
            quote_identifier(table)
        ),
        params: vec![BindValue::Text(id.to_string())],
    }
}

/// Renders a listing of every collection, by id.
pub fn collections(table: &str) -> Sql {
    Sql {
        statement: format!(
            "SELECT content FROM {} ORDER BY id",
            quote_identifier(table)
        ),
        params: Vec::new(),
    }
}

/// Quotes a possibly schema-qualified table name.
///
/// # Examples
///
/// ```
/// use stac_search_postgres::sql::quote_identifier;
///
/// assert_eq!(quote_identifier("stac.items"), r#""stac"."items""#);
/// ```
pub fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

#[derive(Debug, Default)]
struct Builder {
    params: Vec<BindValue>,
    property_names: HashMap<String, String>,
}

impl Builder {
    fn bind(&mut self, value: BindValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn field(&mut self, field: &Field) -> String {
        match field {
            Field::Id => "id".to_string(),
            Field::Collection => "collection".to_string(),
            Field::Datetime => "datetime".to_string(),
            Field::Property(name) => {
                let placeholder = match self.property_names.get(name) {
                    Some(placeholder) => placeholder.clone(),
                    None => {
                        let placeholder = self.bind(BindValue::Text(name.clone()));
                        let _ = self
                            .property_names
                            .insert(name.clone(), placeholder.clone());
                        placeholder
                    }
                };
                format!("nullif(content->'properties'->{placeholder}::text, 'null'::jsonb)")
            }
        }
    }

    /// Binds a single non-null operand, typed for the field it's compared to.
    fn operand(&mut self, field: &Field, value: &Value) -> Result<String> {
        match (field, value) {
            (Field::Id | Field::Collection, Value::String(s)) => {
                Ok(self.bind(BindValue::Text(s.clone())))
            }
            (Field::Datetime, value) => {
                let datetime = timestamp(field, value)?;
                Ok(self.bind(BindValue::Timestamp(datetime)))
            }
            (Field::Property(_), value) => {
                let placeholder = self.bind(BindValue::Json(value.clone()));
                Ok(format!("{placeholder}::jsonb"))
            }
            (field, value) => Err(unbindable(field, value)),
        }
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<String> {
        match predicate {
            Predicate::Collections(collections) => {
                let placeholder = self.bind(BindValue::TextArray(collections.clone()));
                Ok(format!("collection = ANY({placeholder})"))
            }
            Predicate::Ids(ids) => {
                let placeholder = self.bind(BindValue::TextArray(ids.clone()));
                Ok(format!("id = ANY({placeholder})"))
            }
            Predicate::Bbox(bbox) => {
                let mut envelopes = Vec::new();
                for rect in bbox.rects() {
                    let xmin = self.bind(BindValue::Float(rect.min().x));
                    let ymin = self.bind(BindValue::Float(rect.min().y));
                    let xmax = self.bind(BindValue::Float(rect.max().x));
                    let ymax = self.bind(BindValue::Float(rect.max().y));
                    envelopes.push(format!(
                        "ST_Intersects(geometry, ST_MakeEnvelope({xmin}, {ymin}, {xmax}, {ymax}, 4326))"
                    ));
                }
                Ok(format!("({})", envelopes.join(" OR ")))
            }
            Predicate::Intersects(geometry) => {
                let placeholder = self.bind(BindValue::Text(geometry.to_string()));
                Ok(format!(
                    "ST_Intersects(geometry, ST_SetSRID(ST_GeomFromGeoJSON({placeholder}::text), 4326))"
                ))
            }
            Predicate::Datetime(interval) => {
                let mut clauses = Vec::with_capacity(2);
                if let Some(start) = interval.start {
                    let placeholder = self.bind(BindValue::Timestamp(start));
                    clauses.push(format!("coalesce(end_datetime, datetime) >= {placeholder}"));
                }
                if let Some(end) = interval.end {
                    let placeholder = self.bind(BindValue::Timestamp(end));
                    clauses.push(format!("datetime <= {placeholder}"));
                }
                if clauses.is_empty() {
                    Ok("TRUE".to_string())
                } else {
                    Ok(format!("({})", clauses.join(" AND ")))
                }
            }
            Predicate::Comparison { field, op, value } => self.comparison(field, *op, value),
        }
    }

    fn comparison(&mut self, field: &Field, op: Operator, value: &Value) -> Result<String> {
        let expr = self.field(field);
        let is_property = matches!(field, Field::Property(_));
        match op {
            Operator::Eq | Operator::Neq => {
                let operand = self.operand(field, value)?;
                let symbol = if op == Operator::Eq { "=" } else { "<>" };
                Ok(format!("{expr} {symbol} {operand}"))
            }
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
                let operand = self.operand(field, value)?;
                let symbol = match op {
                    Operator::Lt => "<",
                    Operator::Lte => "<=",
                    Operator::Gt => ">",
                    _ => ">=",
                };
                if is_property {
                    // jsonb orders across types, the query extension doesn't.
                    Ok(format!(
                        "(jsonb_typeof({expr}) = jsonb_typeof({operand}) AND {expr} {symbol} {operand})"
                    ))
                } else {
                    Ok(format!("{expr} {symbol} {operand}"))
                }
            }
            Operator::StartsWith | Operator::EndsWith | Operator::Contains => {
                let s = match (field, value) {
                    (Field::Datetime, _) | (_, Value::Null) => {
                        return Err(unbindable(field, value));
                    }
                    (_, Value::String(s)) => escape_like(s),
                    (field, value) => return Err(unbindable(field, value)),
                };
                let pattern = match op {
                    Operator::StartsWith => format!("{s}%"),
                    Operator::EndsWith => format!("%{s}"),
                    _ => format!("%{s}%"),
                };
                let placeholder = self.bind(BindValue::Text(pattern));
                if is_property {
                    Ok(format!(
                        "(jsonb_typeof({expr}) = 'string' AND ({expr} #>> '{{}}') LIKE {placeholder})"
                    ))
                } else {
                    Ok(format!("{expr} LIKE {placeholder}"))
                }
            }
            Operator::In => {
                let values = value
                    .as_array()
                    .ok_or_else(|| unbindable(field, value))?;
                match field {
                    Field::Id | Field::Collection => {
                        let values = values
                            .iter()
                            .map(|value| {
                                value
                                    .as_str()
                                    .map(String::from)
                                    .ok_or_else(|| unbindable(field, value))
                            })
                            .collect::<Result<Vec<_>>>()?;
                        let placeholder = self.bind(BindValue::TextArray(values));
                        Ok(format!("{expr} = ANY({placeholder})"))
                    }
                    Field::Datetime => {
                        let values = values
                            .iter()
                            .map(|value| timestamp(field, value))
                            .collect::<Result<Vec<_>>>()?;
                        let placeholder = self.bind(BindValue::TimestampArray(values));
                        Ok(format!("{expr} = ANY({placeholder})"))
                    }
                    Field::Property(_) => {
                        let placeholder = self.bind(BindValue::Json(value.clone()));
                        Ok(format!(
                            "({expr} IS NOT NULL AND {placeholder}::jsonb @> jsonb_build_array({expr}))"
                        ))
                    }
                }
            }
        }
    }

    fn order_by(&mut self, order: &[Order]) -> String {
        order
            .iter()
            .map(|order| {
                let expr = self.field(&order.field);
                match order.direction {
                    Direction::Ascending => format!("{expr} ASC NULLS LAST"),
                    Direction::Descending => format!("{expr} DESC NULLS FIRST"),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Renders "strictly after the seek values" under this ordering as an
    /// OR of ANDs, one disjunct per ordering term.
    fn seek(&mut self, order: &[Order], seek: &Seek) -> Result<String> {
        let mut terms = Vec::with_capacity(order.len());
        for (order, value) in order.iter().zip(&seek.values) {
            let expr = self.field(&order.field);
            let operand = if value.is_null() {
                None
            } else {
                Some(self.operand(&order.field, value)?)
            };
            terms.push((expr, order.direction, operand));
        }

        let mut clauses = Vec::with_capacity(terms.len());
        for (i, (expr, direction, operand)) in terms.iter().enumerate() {
            let after = match (direction, operand) {
                (Direction::Ascending, Some(operand)) => {
                    format!("({expr} > {operand} OR {expr} IS NULL)")
                }
                // Nulls are last, nothing comes after them.
                (Direction::Ascending, None) => continue,
                (Direction::Descending, Some(operand)) => format!("{expr} < {operand}"),
                (Direction::Descending, None) => format!("{expr} IS NOT NULL"),
            };
            let mut conjuncts: Vec<String> = terms[..i]
                .iter()
                .map(|(expr, _, operand)| match operand {
                    Some(operand) => format!("{expr} = {operand}"),
                    None => format!("{expr} IS NULL"),
                })
                .collect();
            if conjuncts.is_empty() {
                clauses.push(after);
            } else {
                conjuncts.push(after);
                clauses.push(format!("({})", conjuncts.join(" AND ")));
            }
        }
        match clauses.len() {
            0 => Ok("FALSE".to_string()),
            1 => Ok(clauses.remove(0)),
            _ => Ok(format!("({})", clauses.join(" OR "))),
        }
    }
}

fn timestamp(field: &Field, value: &Value) -> Result<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| parse_rfc3339(s).ok())
        .ok_or_else(|| unbindable(field, value))
}

fn unbindable(field: &Field, value: &Value) -> Error {
    Error::Unbindable {
        field: field.to_string(),
        value: value.clone(),
    }
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
