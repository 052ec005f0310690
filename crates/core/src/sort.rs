use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{cmp::Ordering, fmt::Display, str::FromStr};

/// Fields by which to sort results.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sortby {
    /// The field to sort by.
    pub field: String,

    /// The direction to sort.
    pub direction: Direction,
}

/// The sort direction.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending
    #[default]
    #[serde(rename = "asc")]
    Ascending,

    /// Descending
    #[serde(rename = "desc")]
    Descending,
}

impl Sortby {
    /// Creates a new ascending sortby for the field.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Sortby;
    ///
    /// let sortby = Sortby::asc("id");
    /// ```
    pub fn asc(field: impl ToString) -> Sortby {
        Sortby {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }

    /// Creates a new descending sortby for the field.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Sortby;
    ///
    /// let sortby = Sortby::desc("id");
    /// ```
    pub fn desc(field: impl ToString) -> Sortby {
        Sortby {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }

    /// Parses a comma-delimited list of sortbys, e.g. `+datetime,-eo:cloud_cover`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Sortby;
    ///
    /// let sortby = Sortby::parse_list("-datetime,id").unwrap();
    /// assert_eq!(sortby, vec![Sortby::desc("datetime"), Sortby::asc("id")]);
    /// ```
    pub fn parse_list(s: &str) -> Result<Vec<Sortby>> {
        s.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse())
            .collect()
    }
}

impl Direction {
    /// Returns the opposite direction.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Direction;
    ///
    /// assert_eq!(Direction::Ascending.reverse(), Direction::Descending);
    /// ```
    pub fn reverse(self) -> Direction {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }

    /// Applies this direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

impl FromStr for Sortby {
    type Err = Error;

    fn from_str(s: &str) -> Result<Sortby> {
        let s = s.trim();
        let (direction, field) = if let Some(field) = s.strip_prefix('-') {
            (Direction::Descending, field)
        } else if let Some(field) = s.strip_prefix('+') {
            (Direction::Ascending, field)
        } else {
            (Direction::Ascending, s)
        };
        if field.is_empty() || field.starts_with(['+', '-']) || field.contains(char::is_whitespace)
        {
            Err(Error::InvalidSortby(s.to_string()))
        } else {
            Ok(Sortby {
                field: field.to_string(),
                direction,
            })
        }
    }
}

impl Display for Sortby {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.direction {
            Direction::Ascending => write!(f, "{}", self.field),
            Direction::Descending => write!(f, "-{}", self.field),
        }
    }
}

/// Compares two sort values in ascending order.
///
/// Missing values and JSON nulls are greater than every other value, so they
/// come last when sorting ascending and first when sorting descending.
///
/// # Examples
///
/// ```
/// use stac_search::compare_values;
/// use serde_json::json;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_values(&json!(1), &json!(2.5)), Ordering::Less);
/// assert_eq!(compare_values(&json!(null), &json!("a")), Ordering::Greater);
/// ```
pub fn compare_values(l: &Value, r: &Value) -> Ordering {
    match (l, r) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a.cmp(&b)
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                a.cmp(&b)
            } else if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            } else {
                Ordering::Equal
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (a, b) in a.iter().zip(b) {
                let ord = compare_values(a, b);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(_), Value::Object(_)) => Ordering::Equal,
        (Value::Bool(_), _) => Ordering::Less,
        (_, Value::Bool(_)) => Ordering::Greater,
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        (Value::String(_), _) => Ordering::Less,
        (_, Value::String(_)) => Ordering::Greater,
        (Value::Array(_), _) => Ordering::Less,
        (_, Value::Array(_)) => Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, Sortby, compare_values};
    use rstest::rstest;
    use serde_json::{Value, json};
    use std::cmp::Ordering;

    #[rstest]
    #[case("id", Sortby::asc("id"))]
    #[case("+id", Sortby::asc("id"))]
    #[case("-properties.eo:cloud_cover", Sortby::desc("properties.eo:cloud_cover"))]
    #[case(" -datetime ", Sortby::desc("datetime"))]
    fn parse(#[case] s: &str, #[case] expected: Sortby) {
        assert_eq!(s.parse::<Sortby>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("+-id")]
    #[case("--id")]
    #[case("a field")]
    fn parse_invalid(#[case] s: &str) {
        let _ = s.parse::<Sortby>().unwrap_err();
    }

    #[test]
    fn parse_list() {
        assert_eq!(
            Sortby::parse_list("+a,-b,c").unwrap(),
            vec![Sortby::asc("a"), Sortby::desc("b"), Sortby::asc("c")]
        );
        let _ = Sortby::parse_list("a,--b").unwrap_err();
    }

    #[test]
    fn serde() {
        let sortby: Sortby =
            serde_json::from_value(json!({"field": "datetime", "direction": "desc"})).unwrap();
        assert_eq!(sortby, Sortby::desc("datetime"));
        let _ = serde_json::from_value::<Sortby>(json!({"field": "datetime", "direction": "up"}))
            .unwrap_err();
    }

    #[test]
    fn display() {
        assert_eq!(Sortby::desc("datetime").to_string(), "-datetime");
        assert_eq!(Sortby::asc("id").to_string(), "id");
    }

    #[test]
    fn nulls_sort_last_ascending() {
        let mut values = vec![json!(null), json!(3), json!(1.5), json!(null), json!(-2)];
        values.sort_by(compare_values);
        assert_eq!(
            values,
            vec![json!(-2), json!(1.5), json!(3), Value::Null, Value::Null]
        );
        values.sort_by(|a, b| Direction::Descending.apply(compare_values(a, b)));
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[4], json!(-2));
    }

    #[test]
    fn mixed_types() {
        assert_eq!(compare_values(&json!(true), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!("a"), &json!(10)), Ordering::Greater);
    }
}
