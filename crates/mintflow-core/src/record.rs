//! Descriptive records
//!
//! The JSON document describing a collectible. Only the fields the pipeline
//! reads or rewrites are typed; everything else (description, attributes,
//! creators, file `type`, ...) is carried through `extra` untouched so the
//! uploaded descriptor keeps every field of the input.

use crate::error::PipelineError;
use crate::types::Locator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::path::Path;

/// Descriptive record of a collectible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Any JSON number; the minter range-checks it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_fee_basis_points: Option<Number>,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `properties` block of a descriptive record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub files: Vec<FileRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of `properties.files`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(default)]
    pub uri: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileRef {
    #[inline]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            extra: Map::new(),
        }
    }
}

impl DescriptiveRecord {
    /// Minimal record with a name and one empty file slot
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: None,
            seller_fee_basis_points: None,
            image: String::new(),
            properties: Some(Properties {
                files: vec![FileRef::default()],
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    /// Parse and validate a record from JSON text
    ///
    /// # Errors
    /// `MalformedInput` if the text is not a record or `name` is absent/empty
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        let record: Self = serde_json::from_str(text)
            .map_err(|e| PipelineError::malformed(format!("descriptive record: {e}")))?;
        record.validate()?;
        Ok(record)
    }

    /// Check required fields
    ///
    /// # Errors
    /// `MalformedInput` when `name` is empty
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::malformed("descriptive record: `name` is empty"));
        }
        Ok(())
    }

    /// Serialize for upload
    ///
    /// # Errors
    /// `MalformedInput` if a carried-through value cannot be encoded
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        serde_json::to_vec(self)
            .map_err(|e| PipelineError::malformed(format!("descriptive record: {e}")))
    }

    /// Record symbol, or `default` when absent or blank
    #[must_use]
    pub fn symbol_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.symbol.as_deref() {
            Some(symbol) if !symbol.trim().is_empty() => symbol,
            _ => default,
        }
    }

    /// Royalty fee, `0` when absent
    #[inline]
    #[must_use]
    pub fn fee_basis_points(&self) -> Number {
        self.seller_fee_basis_points
            .clone()
            .unwrap_or_else(|| Number::from(0))
    }

    /// Files listed under `properties.files`, empty if there is no block
    #[must_use]
    pub fn files(&self) -> &[FileRef] {
        self.properties.as_ref().map_or(&[], |p| p.files.as_slice())
    }
}

/// Read and validate a descriptive record from disk
///
/// # Errors
/// `MalformedInput` if the file cannot be read or parsed
pub async fn load_record(path: &Path) -> Result<DescriptiveRecord, PipelineError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PipelineError::malformed(format!("cannot read {}: {e}", path.display())))?;
    DescriptiveRecord::from_json(&text)
}

/// Point the record's image and first file reference at `image`
///
/// Returns a new record; `record` itself is never modified.
///
/// # Errors
/// `MalformedInput` if the record has no `properties.files` slot to rewrite
pub fn rewrite_locators(
    record: &DescriptiveRecord,
    image: &Locator,
) -> Result<DescriptiveRecord, PipelineError> {
    if record.files().is_empty() {
        return Err(PipelineError::malformed(
            "descriptive record: `properties.files` is missing or empty",
        ));
    }

    let mut rewritten = record.clone();
    rewritten.image = image.as_str().to_string();
    if let Some(first) = rewritten
        .properties
        .as_mut()
        .and_then(|p| p.files.first_mut())
    {
        first.uri = image.as_str().to_string();
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const ITEM_FIVE: &str = r#"{
        "name": "Item #5",
        "symbol": "ITM",
        "description": "Fifth item",
        "seller_fee_basis_points": 500,
        "image": "5.jpg",
        "attributes": [{"trait_type": "Colour", "value": "Red"}],
        "properties": {
            "category": "image",
            "files": [{"uri": "5.jpg", "type": "image/jpeg"}, {"uri": "5.png"}]
        }
    }"#;

    #[test]
    fn parses_typed_and_extra_fields() {
        let record = DescriptiveRecord::from_json(ITEM_FIVE).unwrap();
        assert_eq!(record.name, "Item #5");
        assert_eq!(record.symbol_or("NFT"), "ITM");
        assert_eq!(record.fee_basis_points(), Number::from(500));
        assert_eq!(record.files().len(), 2);
        assert!(record.extra.contains_key("attributes"));
        assert_eq!(record.files()[0].extra["type"], "image/jpeg");
    }

    #[test]
    fn missing_name_is_malformed() {
        let err = DescriptiveRecord::from_json(r#"{"image": ""}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));

        let err = DescriptiveRecord::from_json(r#"{"name": "  "}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[test]
    fn oversized_fee_still_parses() {
        let record = DescriptiveRecord::from_json(
            r#"{"name": "Huge", "seller_fee_basis_points": 18446744073709551615}"#,
        )
        .unwrap();
        assert_eq!(record.fee_basis_points(), Number::from(u64::MAX));

        let record =
            DescriptiveRecord::from_json(r#"{"name": "Frac", "seller_fee_basis_points": 2.5}"#)
                .unwrap();
        assert!(record.fee_basis_points().is_f64());
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = DescriptiveRecord::from_json("{not json").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[test]
    fn defaults_apply_when_absent() {
        let record = DescriptiveRecord::from_json(r#"{"name": "Bare"}"#).unwrap();
        assert_eq!(record.symbol_or("NFT"), "NFT");
        assert_eq!(record.fee_basis_points(), Number::from(0));
        assert!(record.files().is_empty());
    }

    #[test]
    fn rewrite_sets_image_and_first_file_only() {
        let record = DescriptiveRecord::from_json(ITEM_FIVE).unwrap();
        let locator = Locator::new("ar://img5");
        let rewritten = rewrite_locators(&record, &locator).unwrap();

        assert_eq!(rewritten.image, "ar://img5");
        assert_eq!(rewritten.files()[0].uri, "ar://img5");
        assert_eq!(rewritten.files()[1].uri, "5.png");
        assert_eq!(rewritten.files()[0].extra, record.files()[0].extra);
        assert_eq!(record.image, "5.jpg");
    }

    #[test]
    fn rewrite_preserves_unknown_fields_through_serialization() {
        let record = DescriptiveRecord::from_json(ITEM_FIVE).unwrap();
        let rewritten = rewrite_locators(&record, &Locator::new("ar://img5")).unwrap();
        let value: Value = serde_json::from_slice(&rewritten.to_json_bytes().unwrap()).unwrap();

        assert_eq!(value["description"], "Fifth item");
        assert_eq!(value["properties"]["category"], "image");
        assert_eq!(value["properties"]["files"][0]["type"], "image/jpeg");
        assert_eq!(value["properties"]["files"][0]["uri"], "ar://img5");
    }

    #[test]
    fn rewrite_without_files_fails_without_mutation() {
        let mut record = DescriptiveRecord::new("Item");
        record.properties = Some(Properties::default());
        let before = record.clone();

        let err = rewrite_locators(&record, &Locator::new("ar://x")).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
        assert_eq!(record, before);

        record.properties = None;
        assert!(rewrite_locators(&record, &Locator::new("ar://x")).is_err());
    }

    #[tokio::test]
    async fn load_record_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("5.json");
        std::fs::write(&path, ITEM_FIVE).unwrap();

        let record = load_record(&path).await.unwrap();
        assert_eq!(record.name, "Item #5");

        let missing = load_record(&dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(PipelineError::MalformedInput(_))));
    }

    fn arb_record() -> impl Strategy<Value = DescriptiveRecord> {
        (
            "[A-Za-z #0-9]{1,24}",
            proptest::collection::vec("[a-z:/0-9.]{0,20}", 1..5),
            proptest::option::of(0i64..=10_000),
        )
            .prop_map(|(name, uris, fee)| {
                let mut record = DescriptiveRecord::new(name);
                record.seller_fee_basis_points = fee.map(Number::from);
                record.properties = Some(Properties {
                    files: uris.into_iter().map(FileRef::new).collect(),
                    extra: Map::new(),
                });
                record
            })
    }

    proptest! {
        #[test]
        fn prop_rewrite_points_both_fields_at_locator(
            record in arb_record(),
            locator in "ar://[a-zA-Z0-9_-]{8,43}",
        ) {
            let locator = Locator::new(locator);
            let rewritten = rewrite_locators(&record, &locator).unwrap();
            prop_assert_eq!(&rewritten.image, locator.as_str());
            prop_assert_eq!(&rewritten.files()[0].uri, locator.as_str());
            prop_assert_eq!(rewritten.files().len(), record.files().len());
        }

        #[test]
        fn prop_rewrite_is_idempotent(
            record in arb_record(),
            locator in "ar://[a-zA-Z0-9_-]{8,43}",
        ) {
            let locator = Locator::new(locator);
            let once = rewrite_locators(&record, &locator).unwrap();
            let twice = rewrite_locators(&once, &locator).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
