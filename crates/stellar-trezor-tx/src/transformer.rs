use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    descriptor::{OpField, OperationDescriptor, OperationKind, TransitionalDescriptor, TxField},
    errors::Result,
    rules::{FieldRules, SemanticType},
};

/// A descriptor whose every field went through its rule, before any
/// relationship-aware normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedTransaction {
    pub fields: BTreeMap<TxField, Value>,
    pub operations: Vec<TransformedOperation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformedOperation {
    pub kind: OperationKind,
    pub fields: BTreeMap<OpField, Value>,
}

fn apply_rule(
    rules: &FieldRules<'_>,
    field: &'static str,
    semantic_type: Option<SemanticType>,
    value: &Value,
) -> Result<Value> {
    match semantic_type {
        Some(semantic_type) => rules.apply(field, semantic_type, value.clone()),
        None => Ok(value.clone()),
    }
}

fn transform_operation(
    rules: &FieldRules<'_>,
    operation: &OperationDescriptor,
) -> Result<TransformedOperation> {
    let fields = operation
        .fields
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(field, value)| {
            Ok((
                *field,
                apply_rule(rules, field.as_str(), field.semantic_type(), value)?,
            ))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;
    Ok(TransformedOperation {
        kind: operation.kind,
        fields,
    })
}

/// Apply the field rules to every top-level field and to every field of every
/// operation. Operations are transformed 1:1 and keep their order; the first
/// failing rule aborts the whole transformation.
///
/// `null` values are treated as absent fields.
pub fn transform(
    descriptor: &TransitionalDescriptor,
    rules: &FieldRules<'_>,
) -> Result<TransformedTransaction> {
    let fields = descriptor
        .fields
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(field, value)| {
            Ok((
                *field,
                apply_rule(rules, field.as_str(), field.semantic_type(), value)?,
            ))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    let operations = descriptor
        .operations
        .iter()
        .map(|operation| transform_operation(rules, operation))
        .collect::<Result<Vec<_>>>()?;

    Ok(TransformedTransaction { fields, operations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capabilities::Capabilities, errors::Error};
    use serde_json::json;

    const ISSUER: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";

    #[test]
    fn fields_without_semantic_type_pass_through() {
        let caps = Capabilities::current();
        let tdesc = TransitionalDescriptor::default()
            .with(TxField::Source, json!(ISSUER))
            .with(TxField::Network, json!("test"))
            .with_operation(
                OperationDescriptor::new(OperationKind::SetOptions)
                    .with(OpField::HomeDomain, json!("example.org"))
                    .with(OpField::MasterWeight, json!(3)),
            );
        let tx = transform(&tdesc, &FieldRules::new(&caps)).unwrap();
        assert_eq!(tx.fields[&TxField::Source], json!(ISSUER));
        assert_eq!(tx.fields[&TxField::Network], json!("test"));
        assert_eq!(tx.operations[0].fields[&OpField::HomeDomain], json!("example.org"));
        assert_eq!(tx.operations[0].fields[&OpField::MasterWeight], json!(3));
    }

    #[test]
    fn operation_order_and_count_preserved() {
        let caps = Capabilities::current();
        let kinds = [
            OperationKind::Payment,
            OperationKind::BumpSequence,
            OperationKind::Payment,
            OperationKind::AccountMerge,
            OperationKind::Inflation,
        ];
        let tdesc = kinds.iter().enumerate().fold(
            TransitionalDescriptor::default(),
            |tdesc, (i, kind)| {
                tdesc.with_operation(
                    OperationDescriptor::new(*kind).with(OpField::Source, json!(format!("op{i}"))),
                )
            },
        );
        let tx = transform(&tdesc, &FieldRules::new(&caps)).unwrap();
        assert_eq!(tx.operations.len(), kinds.len());
        for (i, (op, kind)) in tx.operations.iter().zip(kinds.iter()).enumerate() {
            assert_eq!(op.kind, *kind);
            assert_eq!(op.fields[&OpField::Source], json!(format!("op{i}")));
        }
    }

    #[test]
    fn rules_applied_in_operations() {
        let caps = Capabilities::current();
        let tdesc = TransitionalDescriptor::default().with_operation(
            OperationDescriptor::new(OperationKind::PathPaymentStrictReceive)
                .with(OpField::SendAsset, json!({ "code": "XLM" }))
                .with(OpField::SendMax, json!("20"))
                .with(OpField::DestAsset, json!({ "code": "BTC", "issuer": ISSUER }))
                .with(OpField::DestAmount, json!("0.001"))
                .with(OpField::Path, json!([{ "code": "USD", "issuer": ISSUER }]))
                .with(OpField::Destination, json!(ISSUER)),
        );
        let tx = transform(&tdesc, &FieldRules::new(&caps)).unwrap();
        let fields = &tx.operations[0].fields;
        assert_eq!(fields[&OpField::SendAsset], Value::Null);
        assert_eq!(fields[&OpField::SendMax], json!("200000000"));
        assert_eq!(fields[&OpField::DestAsset]["type"], json!(1));
        assert_eq!(fields[&OpField::DestAmount], json!("10000"));
        assert_eq!(fields[&OpField::Path][0]["type"], json!(1));
    }

    #[test]
    fn null_fields_are_absent() {
        let caps = Capabilities::current();
        let tdesc = TransitionalDescriptor::default()
            .with(TxField::Memo, Value::Null)
            .with(TxField::Fee, json!("100"));
        let tx = transform(&tdesc, &FieldRules::new(&caps)).unwrap();
        assert!(!tx.fields.contains_key(&TxField::Memo));
        assert_eq!(tx.fields[&TxField::Fee], json!("1000000000"));
    }

    #[test]
    fn first_failure_aborts() {
        let caps = Capabilities::current();
        let tdesc = TransitionalDescriptor::default()
            .with_operation(
                OperationDescriptor::new(OperationKind::Payment).with(OpField::Amount, json!("1")),
            )
            .with_operation(
                OperationDescriptor::new(OperationKind::Payment)
                    .with(OpField::Amount, json!("one")),
            );
        assert!(
            transform(&tdesc, &FieldRules::new(&caps)).is_err_and(|e| match e {
                Error::InvalidField { field, .. } => field == "amount",
                _ => unreachable!("Only InvalidField errors can be raised"),
            })
        );
    }
}
