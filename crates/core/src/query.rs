//! The [query](https://github.com/stac-api-extensions/query) extension.
//!
//! A query is a JSON object keyed by field name, with an object of operators
//! and operands for each field:
//!
//! ```json
//! {"eo:cloud_cover": {"gte": 0, "lt": 10}, "platform": {"in": ["landsat-8", "landsat-9"]}}
//! ```

use crate::{Error, Result, sort::compare_values};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{cmp::Ordering, fmt::Display, str::FromStr};

/// A parsed query expression: every comparison must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// The comparisons, in the order they appeared.
    pub comparisons: Vec<Comparison>,
}

/// One field compared against one operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// The field name, as written in the request.
    pub field: String,

    /// The operator.
    pub op: Operator,

    /// The operand.
    pub value: Value,
}

/// A query operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    /// Equal to.
    Eq,
    /// Not equal to.
    Neq,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// The string starts with the operand.
    StartsWith,
    /// The string ends with the operand.
    EndsWith,
    /// The string contains the operand.
    Contains,
    /// The value is one of the operand's members.
    In,
}

impl Query {
    /// Parses a query from its JSON object form.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::{Operator, Query};
    /// use serde_json::json;
    ///
    /// let value = json!({"eo:cloud_cover": {"lt": 10}});
    /// let query = Query::from_map(value.as_object().unwrap()).unwrap();
    /// assert_eq!(query.comparisons[0].op, Operator::Lt);
    /// ```
    pub fn from_map(map: &Map<String, Value>) -> Result<Query> {
        let mut comparisons = Vec::new();
        for (field, operators) in map {
            let operators = operators.as_object().ok_or_else(|| {
                Error::InvalidQuery(format!("the value for {field} is not an object"))
            })?;
            for (op, value) in operators {
                comparisons.push(Comparison::new(field.clone(), op.parse()?, value.clone())?);
            }
        }
        Ok(Query { comparisons })
    }
}

impl Comparison {
    /// Creates a new comparison, checking that the operand suits the operator.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::{Comparison, Operator};
    /// use serde_json::json;
    ///
    /// let _ = Comparison::new("platform", Operator::StartsWith, json!("landsat")).unwrap();
    /// let _ = Comparison::new("platform", Operator::StartsWith, json!(8)).unwrap_err();
    /// ```
    pub fn new(field: impl ToString, op: Operator, value: Value) -> Result<Comparison> {
        let field = field.to_string();
        let valid = match op {
            Operator::Eq | Operator::Neq => is_scalar(&value),
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
                value.is_number() || value.is_string()
            }
            Operator::StartsWith | Operator::EndsWith | Operator::Contains => value.is_string(),
            Operator::In => value
                .as_array()
                .is_some_and(|values| !values.is_empty() && values.iter().all(is_scalar)),
        };
        if valid {
            Ok(Comparison { field, op, value })
        } else {
            Err(Error::InvalidOperand {
                field,
                op: op.to_string(),
                value,
            })
        }
    }

    /// Returns true if this value satisfies the comparison.
    ///
    /// A missing value, or a JSON null, never matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::{Comparison, Operator};
    /// use serde_json::{json, Value};
    ///
    /// let comparison = Comparison::new("eo:cloud_cover", Operator::Lte, json!(10)).unwrap();
    /// assert!(comparison.matches(&json!(10.0)));
    /// assert!(!comparison.matches(&json!(10.5)));
    /// assert!(!comparison.matches(&Value::Null));
    /// ```
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        match self.op {
            Operator::Eq => equals(value, &self.value),
            Operator::Neq => !equals(value, &self.value),
            Operator::Lt => ordered(value, &self.value).is_some_and(Ordering::is_lt),
            Operator::Lte => ordered(value, &self.value).is_some_and(Ordering::is_le),
            Operator::Gt => ordered(value, &self.value).is_some_and(Ordering::is_gt),
            Operator::Gte => ordered(value, &self.value).is_some_and(Ordering::is_ge),
            Operator::StartsWith => strings(value, &self.value).is_some_and(|(v, o)| v.starts_with(o)),
            Operator::EndsWith => strings(value, &self.value).is_some_and(|(v, o)| v.ends_with(o)),
            Operator::Contains => strings(value, &self.value).is_some_and(|(v, o)| v.contains(o)),
            Operator::In => self
                .value
                .as_array()
                .is_some_and(|values| values.iter().any(|operand| equals(value, operand))),
        }
    }
}

impl Operator {
    /// Returns this operator's name in the query extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::Contains => "contains",
            Operator::In => "in",
        }
    }

    /// Returns true if this operator only works on strings.
    pub fn is_string_match(&self) -> bool {
        matches!(
            self,
            Operator::StartsWith | Operator::EndsWith | Operator::Contains
        )
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Operator> {
        match s {
            "eq" => Ok(Operator::Eq),
            "neq" => Ok(Operator::Neq),
            "lt" => Ok(Operator::Lt),
            "lte" => Ok(Operator::Lte),
            "gt" => Ok(Operator::Gt),
            "gte" => Ok(Operator::Gte),
            "startsWith" => Ok(Operator::StartsWith),
            "endsWith" => Ok(Operator::EndsWith),
            "contains" => Ok(Operator::Contains),
            "in" => Ok(Operator::In),
            _ => Err(Error::UnsupportedOperator(s.to_string())),
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_scalar(value: &Value) -> bool {
    value.is_string() || value.is_number() || value.is_boolean()
}

fn equals(l: &Value, r: &Value) -> bool {
    ordered(l, r).is_some_and(Ordering::is_eq) || (l.is_boolean() && l == r)
}

/// Compares values of the same kind; values of different kinds are unordered.
fn ordered(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_)) => {
            Some(compare_values(l, r))
        }
        _ => None,
    }
}

fn strings<'a>(l: &'a Value, r: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((l.as_str()?, r.as_str()?))
}

#[cfg(test)]
mod tests {
    use super::{Comparison, Operator, Query};
    use crate::ErrorKind;
    use rstest::rstest;
    use serde_json::{Value, json};

    #[test]
    fn parse() {
        let value = json!({
            "eo:cloud_cover": {"gte": 0, "lt": 10},
            "platform": {"in": ["landsat-8", "landsat-9"]}
        });
        let query = Query::from_map(value.as_object().unwrap()).unwrap();
        assert_eq!(query.comparisons.len(), 3);
        assert_eq!(query.comparisons[0].field, "eo:cloud_cover");
        assert_eq!(query.comparisons[0].op, Operator::Gte);
        assert_eq!(query.comparisons[2].op, Operator::In);
    }

    #[test]
    fn unsupported_operator() {
        let value = json!({"eo:cloud_cover": {"between": [0, 10]}});
        let error = Query::from_map(value.as_object().unwrap()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::QueryTranslationError);
    }

    #[test]
    fn not_an_object() {
        let value = json!({"eo:cloud_cover": 10});
        let error = Query::from_map(value.as_object().unwrap()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ValidationError);
    }

    #[rstest]
    #[case(Operator::Lt, json!(true))]
    #[case(Operator::Eq, json!({"a": 1}))]
    #[case(Operator::Eq, Value::Null)]
    #[case(Operator::In, json!([]))]
    #[case(Operator::In, json!("landsat-8"))]
    #[case(Operator::Contains, json!(8))]
    fn invalid_operand(#[case] op: Operator, #[case] value: Value) {
        let error = Comparison::new("field", op, value).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::QueryTranslationError);
    }

    #[rstest]
    #[case(Operator::Eq, json!(10), json!(10.0), true)]
    #[case(Operator::Eq, json!("10"), json!(10), false)]
    #[case(Operator::Neq, json!("a"), json!("b"), true)]
    #[case(Operator::Gt, json!(11), json!(10), true)]
    #[case(Operator::Gt, json!("11"), json!(10), false)]
    #[case(Operator::Gte, json!("b"), json!("a"), true)]
    #[case(Operator::StartsWith, json!("landsat-8"), json!("landsat"), true)]
    #[case(Operator::EndsWith, json!("landsat-8"), json!("-8"), true)]
    #[case(Operator::Contains, json!("landsat-8"), json!("sat"), true)]
    #[case(Operator::Contains, json!(["landsat"]), json!("sat"), false)]
    #[case(Operator::In, json!("landsat-9"), json!(["landsat-8", "landsat-9"]), true)]
    #[case(Operator::In, json!(7), json!([8, 9]), false)]
    #[case(Operator::Eq, json!(true), json!(true), true)]
    #[case(Operator::Neq, Value::Null, json!(1), false)]
    fn matches(
        #[case] op: Operator,
        #[case] value: Value,
        #[case] operand: Value,
        #[case] expected: bool,
    ) {
        let comparison = Comparison::new("field", op, operand).unwrap();
        assert_eq!(comparison.matches(&value), expected);
    }

    #[test]
    fn operator_names() {
        for op in ["eq", "neq", "lt", "lte", "gt", "gte", "startsWith", "endsWith", "contains", "in"] {
            assert_eq!(op.parse::<Operator>().unwrap().as_str(), op);
        }
    }
}
