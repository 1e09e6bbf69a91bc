//! Transformation steps that depend on relationships between fields or on the
//! operation type: fee, timebounds and per-operation restructuring.

use serde_json::{json, Map, Value};

use crate::{
    capabilities::{reject, Capabilities},
    descriptor::{OpField, OperationKind, TxField},
    device::{DeviceOperation, DeviceOperationType, DeviceTransaction, SignerType, TimeBounds},
    errors::{Error, Result},
    rules::{asset_type_for_code, to_stroops, STROOPS_PER_UNIT},
    strkey::raw_public_key,
    transformer::{TransformedOperation, TransformedTransaction},
};

/// Fee charged per operation when the transaction does not set one
pub const DEFAULT_FEE_PER_OPERATION: u32 = 100;
/// The largest trust line limit (`i64::MAX` stroops)
pub const MAX_TRUSTLINE_LIMIT: &str = "922337203685.4775807";

fn as_stroops(field: TxField, value: &Value) -> Result<i64> {
    value
        .as_str()
        .and_then(|s| s.parse::<i64>().ok())
        .or_else(|| value.as_i64())
        .ok_or_else(|| {
            Error::invalid_field(field.as_str(), format!("{value} is not a stroop amount"))
        })
}

fn normalize_fee(fee: Option<Value>, operation_count: usize) -> Result<u32> {
    let scaled = fee
        .map(|fee| as_stroops(TxField::Fee, &fee))
        .transpose()?
        .unwrap_or(0);
    if scaled == 0 {
        return u32::try_from(operation_count)
            .ok()
            .and_then(|count| count.checked_mul(DEFAULT_FEE_PER_OPERATION))
            .ok_or_else(|| Error::invalid_field("fee", "too many operations"));
    }
    let fee = (scaled + STROOPS_PER_UNIT / 2) / STROOPS_PER_UNIT;
    u32::try_from(fee).map_err(|_| Error::invalid_field("fee", format!("{fee} is out of range")))
}

fn as_time(field: TxField, value: Option<Value>) -> Result<u64> {
    match value {
        None => Ok(0),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| Error::invalid_field(field.as_str(), format!("{v} is not a timestamp"))),
    }
}

fn assemble_timebounds(
    min_time: Option<Value>,
    max_time: Option<Value>,
) -> Result<Option<TimeBounds>> {
    if min_time.is_none() && max_time.is_none() {
        return Ok(None);
    }
    Ok(Some(TimeBounds {
        min_time: as_time(TxField::MinTime, min_time)?,
        max_time: as_time(TxField::MaxTime, max_time)?,
    }))
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn resolve_signer_key(signer: &mut Value) -> Result<()> {
    let signer = signer
        .as_object_mut()
        .ok_or_else(|| Error::invalid_field("signer", "expected a signer object"))?;
    if signer.get("type").and_then(Value::as_u64) != Some(SignerType::Account as u64) {
        return Ok(());
    }
    let account_id = signer
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_field("signer", "signer without key"))?;
    let raw = raw_public_key(account_id)?;
    signer.insert("key".to_owned(), Value::String(hex::encode(raw)));
    Ok(())
}

fn normalize_operation(
    operation: TransformedOperation,
    capabilities: &Capabilities,
) -> Result<DeviceOperation> {
    let TransformedOperation { kind, mut fields } = operation;
    capabilities.check_operation(kind)?;

    // Keys the device expects that have no descriptor counterpart
    let mut derived: Vec<(&'static str, Value)> = Vec::new();

    let device_kind = match kind {
        OperationKind::AllowTrust => {
            let code = fields
                .get(&OpField::AssetCode)
                .and_then(Value::as_str)
                .ok_or_else(|| Error::invalid_field("assetCode", "allowTrust without asset code"))?;
            derived.push(("assetType", json!(asset_type_for_code(code) as u8)));
            let authorize = truthy(fields.get(&OpField::Authorize));
            fields.insert(OpField::Authorize, json!(u8::from(authorize)));
            DeviceOperationType::AllowTrust
        }
        OperationKind::ChangeTrust => {
            if !fields.contains_key(&OpField::Limit) {
                let limit = to_stroops(OpField::Limit.as_str(), MAX_TRUSTLINE_LIMIT)?;
                fields.insert(OpField::Limit, Value::String(limit.to_string()));
            }
            if let Some(asset) = fields.remove(&OpField::Asset) {
                derived.push(("line", asset));
            }
            DeviceOperationType::ChangeTrust
        }
        OperationKind::CreatePassiveSellOffer | OperationKind::CreatePassiveOffer => {
            DeviceOperationType::CreatePassiveOffer
        }
        OperationKind::ManageSellOffer | OperationKind::ManageOffer => {
            DeviceOperationType::ManageOffer
        }
        OperationKind::PathPaymentStrictReceive | OperationKind::PathPayment => {
            DeviceOperationType::PathPayment
        }
        OperationKind::ManageBuyOffer | OperationKind::PathPaymentStrictSend => {
            return Err(reject(format!("operation {kind}")))
        }
        OperationKind::SetOptions => {
            if let Some(signer) = fields.get_mut(&OpField::Signer) {
                if !capabilities.set_signer {
                    return Err(reject("set signer"));
                }
                resolve_signer_key(signer)?;
            }
            DeviceOperationType::SetOptions
        }
        OperationKind::CreateAccount => DeviceOperationType::CreateAccount,
        OperationKind::Payment => DeviceOperationType::Payment,
        OperationKind::AccountMerge => DeviceOperationType::AccountMerge,
        OperationKind::Inflation => DeviceOperationType::Inflation,
        OperationKind::ManageData => DeviceOperationType::ManageData,
        OperationKind::BumpSequence => DeviceOperationType::BumpSequence,
    };

    let mut device_fields: Map<String, Value> = fields
        .into_iter()
        .map(|(field, value)| (field.as_str().to_owned(), value))
        .collect();
    device_fields.extend(derived.into_iter().map(|(k, v)| (k.to_owned(), v)));

    Ok(DeviceOperation {
        kind: device_kind,
        fields: device_fields,
    })
}

/// Turn a [TransformedTransaction] into the [DeviceTransaction]: fee, then
/// timebounds, then every operation in order.
pub fn normalize(
    transaction: TransformedTransaction,
    capabilities: &Capabilities,
) -> Result<DeviceTransaction> {
    let TransformedTransaction { fields, operations } = transaction;

    let mut source = None;
    let mut fee = None;
    let mut sequence = None;
    let mut min_time = None;
    let mut max_time = None;
    let mut memo = None;
    let mut network = None;
    for (field, value) in fields {
        match field {
            TxField::Source => {
                source = Some(
                    value
                        .as_str()
                        .ok_or_else(|| Error::invalid_field(field.as_str(), "expected an address"))?
                        .to_owned(),
                )
            }
            TxField::Fee => fee = Some(value),
            TxField::Sequence => {
                sequence = Some(value.as_i64().ok_or_else(|| {
                    Error::invalid_field(field.as_str(), "expected a sequence number")
                })?)
            }
            TxField::MinTime => min_time = Some(value),
            TxField::MaxTime => max_time = Some(value),
            TxField::Memo => memo = Some(value),
            TxField::Network => {
                network = Some(
                    value
                        .as_str()
                        .ok_or_else(|| Error::invalid_field(field.as_str(), "expected a network"))?
                        .to_owned(),
                )
            }
        }
    }

    let fee = normalize_fee(fee, operations.len())?;
    let timebounds = assemble_timebounds(min_time, max_time)?;
    let operations = operations
        .into_iter()
        .map(|operation| normalize_operation(operation, capabilities))
        .collect::<Result<Vec<_>>>()?;

    Ok(DeviceTransaction {
        source,
        fee,
        sequence,
        timebounds,
        memo,
        operations,
        network,
    })
}
