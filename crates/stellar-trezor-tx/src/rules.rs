//! Field rules: one pure transform per semantic type.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

use crate::{
    capabilities::{reject, Capabilities},
    device::{AssetType, MemoType, SignerType},
    errors::{Error, Result},
};

/// Number of stroops in one unit of any Stellar asset
pub const STROOPS_PER_UNIT: i64 = 10_000_000;
const DECIMALS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SemanticType {
    Amount,
    Asset,
    AssetList,
    Buffer,
    Date,
    Memo,
    Price,
    Sequence,
    Signer,
}

/// The rule registry. Rules are stateless; the [Capabilities] only decide
/// which values a rule must refuse.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules<'a> {
    capabilities: &'a Capabilities,
}

impl<'a> FieldRules<'a> {
    pub fn new(capabilities: &'a Capabilities) -> Self {
        Self { capabilities }
    }

    /// Apply the rule of `semantic_type` to the raw `value` of `field`.
    pub fn apply(&self, field: &str, semantic_type: SemanticType, value: Value) -> Result<Value> {
        match semantic_type {
            SemanticType::Amount => amount(field, &value).map(Value::String),
            SemanticType::Asset => asset(field, value),
            SemanticType::AssetList => asset_list(field, value),
            SemanticType::Buffer => buffer(field, &value).map(Value::String),
            SemanticType::Date => date(field, &value).map(|seconds| json!(seconds)),
            SemanticType::Memo => self.memo(field, value),
            SemanticType::Price => price(field, value),
            SemanticType::Sequence => sequence(field, &value).map(|seq| json!(seq)),
            SemanticType::Signer => signer(field, value),
        }
    }

    fn memo(&self, field: &str, value: Value) -> Result<Value> {
        let Value::Object(mut memo) = value else {
            return Err(Error::invalid_field(field, "expected a memo object"));
        };
        let kind = memo
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_field(field, "memo without type"))?
            .to_owned();
        let raw = memo.remove("value").unwrap_or(Value::Null);
        if raw.is_null() && kind != "none" {
            return Err(Error::invalid_field(field, format!("{kind} memo without value")));
        }
        let (memo_type, key, content) = match kind.as_str() {
            "none" => (MemoType::None, None, Value::Null),
            "text" => (MemoType::Text, Some("text"), raw),
            "base64" => {
                if !self.capabilities.binary_memo {
                    return Err(reject("binary memo text"));
                }
                let encoded = raw
                    .as_str()
                    .ok_or_else(|| Error::invalid_field(field, "base64 memo without value"))?;
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| Error::invalid_field(field, e))?;
                if bytes.contains(&0) {
                    return Err(reject("binary memo text"));
                }
                let text = String::from_utf8(bytes).map_err(|_| reject("binary memo text"))?;
                (MemoType::Text, Some("text"), Value::String(text))
            }
            "id" => (MemoType::Id, Some("id"), raw),
            "hash" => (MemoType::Hash, Some("hash"), raw),
            "return" => (MemoType::Return, Some("hash"), raw),
            other => {
                return Err(Error::invalid_field(
                    field,
                    format!("unknown memo type \"{other}\""),
                ))
            }
        };
        memo.insert("type".to_owned(), json!(memo_type as u8));
        if let Some(key) = key {
            memo.insert(key.to_owned(), content);
        }
        Ok(Value::Object(memo))
    }
}

/// Convert a decimal amount into its integer number of stroops, rounding half
/// up on the eighth decimal. Integer arithmetic only.
pub fn to_stroops(field: &str, amount: &str) -> Result<i64> {
    let invalid = |reason: &str| Error::invalid_field(field, format!("{reason}: \"{amount}\""));

    let digits = amount.trim();
    let digits = digits.strip_prefix('+').unwrap_or(digits);
    if digits.starts_with('-') {
        return Err(invalid("negative amount"));
    }
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if (int_part.is_empty() && frac_part.is_empty())
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid("not a decimal amount"));
    }

    let mut stroops: i128 = 0;
    for b in int_part.bytes() {
        stroops = stroops * 10 + i128::from(b - b'0');
        if stroops > i128::from(i64::MAX) {
            return Err(invalid("amount too large"));
        }
    }
    stroops *= i128::from(STROOPS_PER_UNIT);

    let frac = frac_part.as_bytes();
    let mut unit = i128::from(STROOPS_PER_UNIT);
    for i in 0..DECIMALS {
        unit /= 10;
        let digit = frac.get(i).map_or(0, |b| i128::from(b - b'0'));
        stroops += digit * unit;
    }
    if frac.get(DECIMALS).is_some_and(|b| *b >= b'5') {
        stroops += 1;
    }

    i64::try_from(stroops).map_err(|_| invalid("amount too large"))
}

fn number_to_decimal(number: &Number) -> String {
    match number.as_f64() {
        // Display of f64 never uses the exponent notation
        Some(f) if !number.is_i64() && !number.is_u64() => f.to_string(),
        _ => number.to_string(),
    }
}

fn amount(field: &str, value: &Value) -> Result<String> {
    let stroops = match value {
        Value::String(s) => to_stroops(field, s)?,
        Value::Number(n) => to_stroops(field, &number_to_decimal(n))?,
        _ => return Err(Error::invalid_field(field, "expected an amount")),
    };
    Ok(stroops.to_string())
}

pub fn asset_type_for_code(code: &str) -> AssetType {
    if code.chars().count() <= 4 {
        AssetType::Alphanum4
    } else {
        AssetType::Alphanum12
    }
}

fn asset(field: &str, value: Value) -> Result<Value> {
    let Value::Object(mut asset) = value else {
        return Err(Error::invalid_field(field, "expected an asset object"));
    };
    let code = asset
        .get("code")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_field(field, "asset without code"))?;
    let has_issuer = asset
        .get("issuer")
        .is_some_and(|issuer| issuer.as_str().map_or(!issuer.is_null(), |s| !s.is_empty()));
    if code == "XLM" && !has_issuer {
        return Ok(Value::Null);
    }
    let asset_type = asset_type_for_code(code);
    asset.insert("type".to_owned(), json!(asset_type as u8));
    Ok(Value::Object(asset))
}

fn asset_list(field: &str, value: Value) -> Result<Value> {
    let Value::Array(assets) = value else {
        return Err(Error::invalid_field(field, "expected a list of assets"));
    };
    Ok(Value::Array(
        assets
            .into_iter()
            .map(|a| asset(field, a))
            .collect::<Result<Vec<_>>>()?,
    ))
}

fn buffer(field: &str, value: &Value) -> Result<String> {
    let (kind, data) = match value {
        Value::Null => return Ok(String::new()),
        Value::String(s) => ("text", s.as_str()),
        Value::Object(o) => {
            let data = match o.get("value") {
                None | Some(Value::Null) => "",
                Some(Value::String(s)) => s.as_str(),
                Some(other) => {
                    return Err(Error::invalid_field(
                        field,
                        format!("buffer value {other} is not a string"),
                    ))
                }
            };
            (o.get("type").and_then(Value::as_str).unwrap_or("text"), data)
        }
        _ => return Err(Error::invalid_field(field, "expected a buffer")),
    };
    if data.is_empty() {
        return Ok(String::new());
    }
    if kind == "base64" {
        let bytes = STANDARD
            .decode(data)
            .map_err(|e| Error::invalid_field(field, e))?;
        Ok(hex::encode(bytes))
    } else {
        Ok(hex::encode(data.as_bytes()))
    }
}

fn parse_date(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    // Dates without offset are read as UTC
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|ndt| ndt.and_utc().timestamp())
}

fn date(field: &str, value: &Value) -> Result<u64> {
    let seconds = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => parse_date(s.trim()),
        _ => None,
    }
    .ok_or_else(|| Error::invalid_field(field, format!("{value} is not a date")))?;
    u64::try_from(seconds).map_err(|_| Error::invalid_field(field, "date before Unix epoch"))
}

fn price(field: &str, value: Value) -> Result<Value> {
    let numerator = match value {
        Value::Object(_) => return Ok(value),
        Value::Number(n) => n,
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Number::from(i),
            Err(_) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .ok_or_else(|| Error::invalid_field(field, format!("\"{s}\" is not a price")))?,
        },
        _ => return Err(Error::invalid_field(field, "expected a price")),
    };
    Ok(json!({ "n": numerator, "d": 1 }))
}

fn sequence(field: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::invalid_field(field, format!("{value} is not a sequence number")))
}

fn signer(field: &str, value: Value) -> Result<Value> {
    let Value::Object(mut signer) = value else {
        return Err(Error::invalid_field(field, "expected a signer object"));
    };
    let signer_type = match signer.get("type").and_then(Value::as_str) {
        Some("key") => SignerType::Account,
        Some("tx") => SignerType::PreAuth,
        Some("hash") => SignerType::Hash,
        other => {
            return Err(Error::invalid_field(
                field,
                format!("unknown signer type {other:?}"),
            ))
        }
    };
    let key = signer
        .remove("value")
        .ok_or_else(|| Error::invalid_field(field, "signer without value"))?;
    let mut device_signer = Map::with_capacity(signer.len() + 1);
    device_signer.extend(signer);
    device_signer.insert("type".to_owned(), json!(signer_type as u8));
    device_signer.insert("key".to_owned(), key);
    Ok(Value::Object(device_signer))
}
