use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Value {
  Number(f64),
  String(String),
  Bool(bool),
}

impl Value {
  pub fn to_f64(&self) -> f64 {
    match self {
      Value::Number(number) if number.is_nan() => 0.,
      Value::Number(number) => *number,
      Value::Bool(boolean) => *boolean as u8 as f64,
      Value::String(string) => {
        let trimmed = string.trim();
        if trimmed.is_empty() {
          return 0.;
        }
        match trimmed.parse::<f64>() {
          Ok(number) if !number.is_nan() => number,
          _ => 0.,
        }
      }
    }
  }

  pub fn to_bool(&self) -> bool {
    match self {
      Value::Bool(boolean) => *boolean,
      Value::Number(number) => *number != 0. && !number.is_nan(),
      Value::String(string) => {
        !(string.is_empty() || string == "0" || string.eq_ignore_ascii_case("false"))
      }
    }
  }

  /// Loose truthiness used when a hat gates its script: `false`, zero, NaN
  /// and the empty string are falsy. Unlike [`Value::to_bool`], `"0"` and
  /// `"false"` are truthy here.
  pub fn is_truthy(&self) -> bool {
    match self {
      Value::Bool(boolean) => *boolean,
      Value::Number(number) => *number != 0. && !number.is_nan(),
      Value::String(string) => !string.is_empty(),
    }
  }

  pub fn is_int(&self) -> bool {
    match self {
      Value::Number(number) => number.is_finite() && number.trunc() == *number,
      Value::Bool(_) => true,
      Value::String(string) => !string.contains('.'),
    }
  }

  fn as_number(&self) -> Option<f64> {
    match self {
      Value::Number(number) if number.is_nan() => None,
      Value::Number(number) => Some(*number),
      Value::Bool(boolean) => Some(*boolean as u8 as f64),
      Value::String(string) => {
        let trimmed = string.trim();
        if trimmed.is_empty() {
          return None;
        }
        trimmed.parse::<f64>().ok().filter(|number| !number.is_nan())
      }
    }
  }

  /// Compares numerically when both sides are numbers, otherwise as
  /// lowercase strings. The sign of the result is the ordering.
  pub fn compare(&self, other: &Value) -> f64 {
    match (self.as_number(), other.as_number()) {
      (Some(left), Some(right)) => {
        if left.is_infinite() && left == right {
          0.
        } else {
          left - right
        }
      }
      _ => {
        let left = self.to_string().to_lowercase();
        let right = other.to_string().to_lowercase();
        match left.cmp(&right) {
          Ordering::Less => -1.,
          Ordering::Equal => 0.,
          Ordering::Greater => 1.,
        }
      }
    }
  }

  pub fn map_as_str<T, F: FnOnce(&str) -> T>(&self, map: F) -> T {
    match self {
      Value::String(string) => map(string),
      other => map(&other.to_string()),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::String(string) => f.write_str(string),
      Value::Bool(boolean) => write!(f, "{boolean}"),
      Value::Number(number) => {
        if number.is_nan() {
          f.write_str("NaN")
        } else if number.is_infinite() {
          f.write_str(if *number > 0. { "Infinity" } else { "-Infinity" })
        } else if *number == 0. {
          f.write_str("0")
        } else {
          write!(f, "{number}")
        }
      }
    }
  }
}

impl From<f64> for Value {
  fn from(number: f64) -> Self {
    Value::Number(number)
  }
}

impl From<bool> for Value {
  fn from(boolean: bool) -> Self {
    Value::Bool(boolean)
  }
}

impl From<String> for Value {
  fn from(string: String) -> Self {
    Value::String(string)
  }
}

impl From<&str> for Value {
  fn from(string: &str) -> Self {
    Value::String(string.to_string())
  }
}
