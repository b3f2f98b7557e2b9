// Request validation against per-entity field rules

use chrono::NaiveDate;
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::shared::AppError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Answer for bodies that are not a JSON object
pub const INVALID_PAYLOAD: &str = "Os dados enviados são inválidos.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
    Boolean,
    /// Trimmed, lowercased address with a dotted domain
    Email,
    /// Kept verbatim, never trimmed or logged
    Secret,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Field rules of one entity. Only fields named here survive validation.
#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    rules: &'static [FieldRule],
}

impl FieldSchema {
    pub const fn new(rules: &'static [FieldRule]) -> Self {
        Self { rules }
    }

    pub fn required(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter().filter(|r| r.required)
    }

    pub fn optional(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter().filter(|r| !r.required)
    }
}

pub struct Validator;

impl Validator {
    /// Checks every required field first, then fills optional fields,
    /// defaulting absent ones to null. Values come back normalized.
    pub fn validate(
        data: &Map<String, Value>,
        schema: &FieldSchema,
    ) -> Result<Map<String, Value>, AppError> {
        let mut fields = Map::new();

        for rule in schema.required() {
            let value = data.get(rule.name).filter(|v| !is_blank(v)).ok_or_else(|| {
                warn!(field = rule.name, "Required field missing");
                AppError::Validation(format!("O campo {} é obrigatório.", rule.name))
            })?;
            fields.insert(rule.name.to_string(), normalize(rule, value)?);
        }

        for rule in schema.optional() {
            let value = match data.get(rule.name) {
                Some(v) if !is_blank(v) => normalize(rule, v)?,
                _ => Value::Null,
            };
            fields.insert(rule.name.to_string(), value);
        }

        debug!(field_count = fields.len(), "Payload validated");
        Ok(fields)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !address.contains(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn invalid(rule: &FieldRule) -> AppError {
    warn!(field = rule.name, kind = ?rule.kind, "Field has an invalid value");
    AppError::Validation(format!("O campo {} é inválido.", rule.name))
}

fn normalize(rule: &FieldRule, value: &Value) -> Result<Value, AppError> {
    let normalized = match rule.kind {
        FieldKind::Text => match value {
            Value::String(s) => Some(Value::String(s.trim().to_string())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            _ => None,
        },
        FieldKind::Integer => match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .filter(|n| i32::try_from(*n).is_ok())
        .map(|n| Value::Number(n.into())),
        FieldKind::Decimal => match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
            _ => None,
        }
        .and_then(Number::from_f64)
        .map(Value::Number),
        FieldKind::Date => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
            .map(|d| Value::String(d.format(DATE_FORMAT).to_string())),
        FieldKind::Boolean => match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "sim" => Some(true),
                "false" | "0" | "nao" | "não" => Some(false),
                _ => None,
            },
            _ => None,
        }
        .map(Value::Bool),
        FieldKind::Email => value
            .as_str()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| is_email(s))
            .map(Value::String),
        FieldKind::Secret => value.as_str().map(|s| Value::String(s.to_string())),
    };

    normalized.ok_or_else(|| invalid(rule))
}
