//! Asset record

use assetledger_core::Record;
use serde::{Deserialize, Serialize};

/// Account attributes of one dealer
///
/// Serialized with the ledger's wire names (`dealerID`, `transAmount`, ...).
/// Every field is required on decode and unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Asset {
    #[serde(rename = "dealerID")]
    pub dealer_id: String,
    pub msisdn: String,
    pub mpin: String,
    pub balance: f64,
    pub status: String,
    #[serde(rename = "transAmount")]
    pub trans_amount: f64,
    #[serde(rename = "transType")]
    pub trans_type: String,
    pub remarks: String,
}

impl Asset {
    /// Build an asset from its key and the caller-supplied attributes
    pub fn new(dealer_id: impl Into<String>, fields: AssetFields) -> Self {
        Self {
            dealer_id: dealer_id.into(),
            msisdn: fields.msisdn,
            mpin: fields.mpin,
            balance: fields.balance,
            status: fields.status,
            trans_amount: fields.trans_amount,
            trans_type: fields.trans_type,
            remarks: fields.remarks,
        }
    }

    /// Every non-key attribute of this asset
    pub fn fields(&self) -> AssetFields {
        AssetFields {
            msisdn: self.msisdn.clone(),
            mpin: self.mpin.clone(),
            status: self.status.clone(),
            trans_type: self.trans_type.clone(),
            remarks: self.remarks.clone(),
            balance: self.balance,
            trans_amount: self.trans_amount,
        }
    }
}

impl Record for Asset {
    fn key(&self) -> &str {
        &self.dealer_id
    }

    fn validate(&self) -> Result<(), String> {
        if self.dealer_id.is_empty() {
            return Err("dealerID must not be empty".into());
        }
        if !self.balance.is_finite() {
            return Err(format!("balance {} is not a finite number", self.balance));
        }
        if !self.trans_amount.is_finite() {
            return Err(format!(
                "transAmount {} is not a finite number",
                self.trans_amount
            ));
        }
        Ok(())
    }
}

/// Non-key asset attributes, supplied wholesale on create and update
#[derive(Debug, Clone, PartialEq)]
pub struct AssetFields {
    pub msisdn: String,
    pub mpin: String,
    pub status: String,
    pub trans_type: String,
    pub remarks: String,
    pub balance: f64,
    pub trans_amount: f64,
}

impl AssetFields {
    /// Attributes in ledger argument order: strings first, then amounts
    pub fn new(
        msisdn: impl Into<String>,
        mpin: impl Into<String>,
        status: impl Into<String>,
        trans_type: impl Into<String>,
        remarks: impl Into<String>,
        balance: f64,
        trans_amount: f64,
    ) -> Self {
        Self {
            msisdn: msisdn.into(),
            mpin: mpin.into(),
            status: status.into(),
            trans_type: trans_type.into(),
            remarks: remarks.into(),
            balance,
            trans_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetledger_core::{CodecError, JsonCodec, RecordCodec};

    fn d1() -> Asset {
        Asset::new(
            "D1",
            AssetFields::new("9999999999", "1234", "Active", "CREDIT", "init", 100.0, 100.0),
        )
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(d1()).unwrap();
        assert_eq!(json["dealerID"], "D1");
        assert_eq!(json["transAmount"], 100.0);
        assert_eq!(json["transType"], "CREDIT");
        assert_eq!(json.as_object().unwrap().len(), 8);
    }

    #[test]
    fn test_codec_roundtrip() {
        let codec = JsonCodec::<Asset>::new();
        let bytes = codec.encode(&d1()).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), d1());
    }

    #[test]
    fn test_decode_rejects_partial_asset() {
        let codec = JsonCodec::<Asset>::new();
        let partial = br#"{"dealerID":"D1","msisdn":"9999999999","balance":1.0}"#;
        assert!(matches!(codec.decode(partial), Err(CodecError::Malformed(_))));

        let mistyped = serde_json::to_string(&d1())
            .unwrap()
            .replace("100.0", "\"lots\"");
        assert!(matches!(
            codec.decode(mistyped.as_bytes()),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_validation() {
        assert!(d1().validate().is_ok());

        let mut asset = d1();
        asset.dealer_id.clear();
        assert!(asset.validate().is_err());

        let mut asset = d1();
        asset.trans_amount = f64::NAN;
        assert!(asset.validate().is_err());
    }

    #[test]
    fn test_fields_rebuild_asset() {
        let asset = d1();
        assert_eq!(Asset::new("D1", asset.fields()), asset);
    }
}
