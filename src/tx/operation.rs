//! Operation kinds that can be queued against a wallet.
//!
//! Each kind carries its own parameter record; the ledger client turns
//! them into network transactions at prepare time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Drops per XRP.
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Discriminant of an [`Operation`], used in reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Settings,
    Trustline,
    Payment,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Settings => "settings",
            OperationKind::Trustline => "trustline",
            OperationKind::Payment => "payment",
        };
        f.write_str(name)
    }
}

/// A draft operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Operation {
    Settings(SettingsParams),
    Trustline(TrustlineParams),
    Payment(PaymentParams),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Settings(_) => OperationKind::Settings,
            Operation::Trustline(_) => OperationKind::Trustline,
            Operation::Payment(_) => OperationKind::Payment,
        }
    }
}

impl From<AccountSetting> for Operation {
    fn from(setting: AccountSetting) -> Self {
        Operation::Settings(SettingsParams { setting })
    }
}

impl From<TrustlineParams> for Operation {
    fn from(params: TrustlineParams) -> Self {
        Operation::Trustline(params)
    }
}

impl From<PaymentParams> for Operation {
    fn from(params: PaymentParams) -> Self {
        Operation::Payment(params)
    }
}

/// One account setting change. A settings transaction changes exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountSetting {
    DefaultRipple(bool),
    #[serde(rename = "disallowIncomingXRP")]
    DisallowIncomingXrp(bool),
    RequireDestinationTag(bool),
    /// Fee charged on transfers of issued currencies, e.g. `1.002`.
    /// `0` or `1.0` removes it.
    TransferRate(f64),
}

impl AccountSetting {
    /// Parse a flag name as accepted on the command line, enabling it.
    pub fn enable_flag(name: &str) -> Result<Self, OperationParseError> {
        match name {
            "defaultRipple" | "default-ripple" => Ok(AccountSetting::DefaultRipple(true)),
            "disallowIncomingXRP" | "disallow-incoming-xrp" => {
                Ok(AccountSetting::DisallowIncomingXrp(true))
            }
            "requireDestinationTag" | "require-destination-tag" => {
                Ok(AccountSetting::RequireDestinationTag(true))
            }
            other => Err(OperationParseError::UnknownFlag(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettingsParams {
    pub setting: AccountSetting,
}

/// Trust line towards an issuer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustlineParams {
    pub currency: String,
    pub counterparty: String,
    pub limit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_in: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_out: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rippling_disabled: Option<bool>,
}

/// Parses `currency=USD,counterparty=rXYZ,limit=10000`.
impl FromStr for TrustlineParams {
    type Err = OperationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut currency = None;
        let mut counterparty = None;
        let mut limit = None;
        let mut quality_in = None;
        let mut quality_out = None;
        let mut rippling_disabled = None;

        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| OperationParseError::MalformedPair(pair.to_string()))?;
            let value = value.trim().to_string();
            match key.trim() {
                "currency" => currency = Some(value),
                "counterparty" => counterparty = Some(value),
                "limit" => limit = Some(value),
                "qualityIn" => quality_in = Some(parse_number(key, &value)?),
                "qualityOut" => quality_out = Some(parse_number(key, &value)?),
                "ripplingDisabled" => {
                    rippling_disabled = Some(value.parse::<bool>().map_err(|_| {
                        OperationParseError::InvalidValue {
                            key: key.to_string(),
                            value: value.clone(),
                        }
                    })?)
                }
                other => return Err(OperationParseError::UnknownKey(other.to_string())),
            }
        }

        Ok(Self {
            currency: currency.ok_or(OperationParseError::MissingKey("currency"))?,
            counterparty: counterparty.ok_or(OperationParseError::MissingKey("counterparty"))?,
            limit: limit.ok_or(OperationParseError::MissingKey("limit"))?,
            quality_in,
            quality_out,
            rippling_disabled,
        })
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, OperationParseError> {
    value.parse().map_err(|_| OperationParseError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Ledger amount: native XRP in drops, or an issued currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Xrp {
        drops: u64,
    },
    Issued {
        currency: String,
        issuer: String,
        value: String,
    },
}

impl Amount {
    /// Whole/fractional XRP to drops, rounded to the nearest drop.
    pub fn xrp(xrp: f64) -> Self {
        Amount::Xrp {
            drops: (xrp * DROPS_PER_XRP as f64).round() as u64,
        }
    }

    pub fn is_xrp(&self) -> bool {
        matches!(self, Amount::Xrp { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentParams {
    pub destination: String,
    pub amount: Amount,
    /// Upper bound on what the source spends. Only meaningful for issued
    /// currencies; the ledger rejects it on XRP-to-XRP payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_tag: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationParseError {
    #[error("unknown account flag '{0}'")]
    UnknownFlag(String),
    #[error("expected key=value, got '{0}'")]
    MalformedPair(String),
    #[error("unknown trustline key '{0}'")]
    UnknownKey(String),
    #[error("missing trustline key '{0}'")]
    MissingKey(&'static str),
    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trustline() {
        let params: TrustlineParams = "currency=USD,counterparty=rIssuer,limit=10000"
            .parse()
            .unwrap();
        assert_eq!(params.currency, "USD");
        assert_eq!(params.counterparty, "rIssuer");
        assert_eq!(params.limit, "10000");
        assert_eq!(params.rippling_disabled, None);
    }

    #[test]
    fn test_parse_trustline_missing_limit() {
        let err = "currency=USD,counterparty=rIssuer"
            .parse::<TrustlineParams>()
            .unwrap_err();
        assert_eq!(err, OperationParseError::MissingKey("limit"));
    }

    #[test]
    fn test_parse_trustline_malformed() {
        let err = "currency".parse::<TrustlineParams>().unwrap_err();
        assert!(matches!(err, OperationParseError::MalformedPair(_)));
    }

    #[test]
    fn test_enable_flag() {
        assert_eq!(
            AccountSetting::enable_flag("defaultRipple").unwrap(),
            AccountSetting::DefaultRipple(true)
        );
        assert!(AccountSetting::enable_flag("noFreeze").is_err());
    }

    #[test]
    fn test_settings_serialize_as_named_field() {
        let op = Operation::from(AccountSetting::DisallowIncomingXrp(true));
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["kind"], "settings");
        assert_eq!(json["setting"]["disallowIncomingXRP"], true);
    }

    #[test]
    fn test_xrp_amount_rounding() {
        assert_eq!(Amount::xrp(50.3), Amount::Xrp { drops: 50_300_000 });
        assert!(Amount::xrp(1.0).is_xrp());
    }
}
