//! Operation → transaction JSON, as accepted by a node's `sign` method.

use serde_json::{json, Map, Value};

use crate::tx::{AccountSetting, Amount, Operation, PaymentParams, TrustlineParams};

/// Require a canonical signature.
pub const TF_FULLY_CANONICAL_SIG: u32 = 0x8000_0000;
const TF_SET_NO_RIPPLE: u32 = 0x0002_0000;
const TF_CLEAR_NO_RIPPLE: u32 = 0x0004_0000;

const ASF_REQUIRE_DEST: u32 = 1;
const ASF_DISALLOW_XRP: u32 = 3;
const ASF_DEFAULT_RIPPLE: u32 = 8;

/// Rates and qualities are expressed in billionths.
const BILLION: f64 = 1_000_000_000.0;

/// Fields every transaction carries, on top of the operation's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonFields<'a> {
    pub account: &'a str,
    pub sequence: u32,
    pub fee_drops: u64,
    pub last_ledger_sequence: Option<u32>,
}

/// Build the full transaction JSON for an operation.
pub fn build_tx_json(operation: &Operation, common: CommonFields<'_>) -> Value {
    let (mut fields, flags) = match operation {
        Operation::Settings(params) => account_set(params.setting),
        Operation::Trustline(params) => trust_set(params),
        Operation::Payment(params) => payment(params),
    };

    fields.insert("Account".into(), json!(common.account));
    fields.insert("Sequence".into(), json!(common.sequence));
    fields.insert("Fee".into(), json!(common.fee_drops.to_string()));
    fields.insert("Flags".into(), json!(flags | TF_FULLY_CANONICAL_SIG));
    if let Some(last) = common.last_ledger_sequence {
        fields.insert("LastLedgerSequence".into(), json!(last));
    }
    Value::Object(fields)
}

fn account_set(setting: AccountSetting) -> (Map<String, Value>, u32) {
    let mut fields = Map::new();
    fields.insert("TransactionType".into(), json!("AccountSet"));

    let toggle = |fields: &mut Map<String, Value>, flag: u32, enable: bool| {
        let key = if enable { "SetFlag" } else { "ClearFlag" };
        fields.insert(key.into(), json!(flag));
    };
    match setting {
        AccountSetting::DefaultRipple(on) => toggle(&mut fields, ASF_DEFAULT_RIPPLE, on),
        AccountSetting::DisallowIncomingXrp(on) => toggle(&mut fields, ASF_DISALLOW_XRP, on),
        AccountSetting::RequireDestinationTag(on) => toggle(&mut fields, ASF_REQUIRE_DEST, on),
        AccountSetting::TransferRate(rate) => {
            fields.insert("TransferRate".into(), json!(transfer_rate(rate)));
        }
    }
    (fields, 0)
}

/// `0` and `1.0` both mean "no transfer fee", encoded as 0.
fn transfer_rate(rate: f64) -> u32 {
    if rate == 0.0 || rate == 1.0 {
        0
    } else {
        (rate * BILLION).round() as u32
    }
}

fn trust_set(params: &TrustlineParams) -> (Map<String, Value>, u32) {
    let mut fields = Map::new();
    fields.insert("TransactionType".into(), json!("TrustSet"));
    fields.insert(
        "LimitAmount".into(),
        json!({
            "currency": params.currency,
            "issuer": params.counterparty,
            "value": params.limit,
        }),
    );
    if let Some(q) = params.quality_in {
        fields.insert("QualityIn".into(), json!((q * BILLION).round() as u32));
    }
    if let Some(q) = params.quality_out {
        fields.insert("QualityOut".into(), json!((q * BILLION).round() as u32));
    }

    let flags = match params.rippling_disabled {
        Some(true) => TF_SET_NO_RIPPLE,
        Some(false) => TF_CLEAR_NO_RIPPLE,
        None => 0,
    };
    (fields, flags)
}

fn payment(params: &PaymentParams) -> (Map<String, Value>, u32) {
    let mut fields = Map::new();
    fields.insert("TransactionType".into(), json!("Payment"));
    fields.insert("Destination".into(), json!(params.destination));
    fields.insert("Amount".into(), amount(&params.amount));
    if let Some(max) = params.max_amount.as_ref().filter(|m| !m.is_xrp()) {
        fields.insert("SendMax".into(), amount(max));
    }
    if let Some(tag) = params.destination_tag {
        fields.insert("DestinationTag".into(), json!(tag));
    }
    (fields, 0)
}

fn amount(amount: &Amount) -> Value {
    match amount {
        Amount::Xrp { drops } => json!(drops.to_string()),
        Amount::Issued {
            currency,
            issuer,
            value,
        } => json!({ "currency": currency, "issuer": issuer, "value": value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(sequence: u32) -> CommonFields<'static> {
        CommonFields {
            account: "rSource",
            sequence,
            fee_drops: 12,
            last_ledger_sequence: Some(110),
        }
    }

    #[test]
    fn test_account_set_flag() {
        let op = Operation::from(AccountSetting::DefaultRipple(true));
        let tx = build_tx_json(&op, common(5));
        assert_eq!(tx["TransactionType"], "AccountSet");
        assert_eq!(tx["SetFlag"], 8);
        assert_eq!(tx["Sequence"], 5);
        assert_eq!(tx["Fee"], "12");
        assert_eq!(tx["LastLedgerSequence"], 110);
        assert_eq!(tx["Flags"], TF_FULLY_CANONICAL_SIG);
    }

    #[test]
    fn test_account_clear_flag() {
        let op = Operation::from(AccountSetting::RequireDestinationTag(false));
        let tx = build_tx_json(&op, common(1));
        assert_eq!(tx["ClearFlag"], 1);
        assert!(tx.get("SetFlag").is_none());
    }

    #[test]
    fn test_transfer_rate() {
        let op = Operation::from(AccountSetting::TransferRate(1.002));
        let tx = build_tx_json(&op, common(1));
        assert_eq!(tx["TransferRate"], 1_002_000_000u32);

        let op = Operation::from(AccountSetting::TransferRate(1.0));
        assert_eq!(build_tx_json(&op, common(1))["TransferRate"], 0);
    }

    #[test]
    fn test_trust_set() {
        let params: TrustlineParams = "currency=USD,counterparty=rIssuer,limit=1000,ripplingDisabled=true"
            .parse()
            .unwrap();
        let tx = build_tx_json(&Operation::from(params), common(6));
        assert_eq!(tx["TransactionType"], "TrustSet");
        assert_eq!(tx["LimitAmount"]["issuer"], "rIssuer");
        assert_eq!(tx["LimitAmount"]["value"], "1000");
        assert_eq!(tx["Flags"], TF_FULLY_CANONICAL_SIG | TF_SET_NO_RIPPLE);
    }

    #[test]
    fn test_xrp_payment_drops_send_max() {
        let params = PaymentParams {
            destination: "rDest".into(),
            amount: Amount::xrp(50.0),
            max_amount: Some(Amount::xrp(50.3)),
            destination_tag: None,
        };
        let tx = build_tx_json(&Operation::from(params), common(1));
        assert_eq!(tx["Amount"], "50000000");
        assert!(tx.get("SendMax").is_none());
    }

    #[test]
    fn test_issued_payment_keeps_send_max() {
        let usd = |value: &str| Amount::Issued {
            currency: "USD".into(),
            issuer: "rIssuer".into(),
            value: value.into(),
        };
        let params = PaymentParams {
            destination: "rDest".into(),
            amount: usd("10"),
            max_amount: Some(usd("10.1")),
            destination_tag: Some(7),
        };
        let tx = build_tx_json(&Operation::from(params), common(1));
        assert_eq!(tx["SendMax"]["value"], "10.1");
        assert_eq!(tx["DestinationTag"], 7);
    }
}
