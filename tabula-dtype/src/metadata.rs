//! The metadata codec: attribute values to and from the byte map stored alongside table data.
//!
//! Keys are dotted attribute paths. A sub-table's own metadata appears in its parent under the
//! sub-table field's prefix.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use tabula_error::{TabulaResult, tabula_bail, tabula_err};
use tabula_scalar::ScalarValue;

use crate::{PATH_SEPARATOR, TableSchema, join_path};

/// Attribute metadata: dotted attribute path to encoded value.
pub type Metadata = BTreeMap<String, Bytes>;

/// Decoded attribute values keyed by dotted attribute path.
pub type AttributeValues = BTreeMap<String, ScalarValue>;

/// Prefix every key of `metadata` with `prefix`.
pub fn prefix_metadata(prefix: &str, metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .map(|(k, v)| (join_path(prefix, k), v.clone()))
        .collect()
}

/// Keep the entries under `prefix`, with the prefix stripped.
pub fn strip_metadata_prefix(prefix: &str, metadata: &Metadata) -> Metadata {
    let mut full = prefix.to_string();
    full.push(PATH_SEPARATOR);
    metadata
        .iter()
        .filter_map(|(k, v)| k.strip_prefix(full.as_str()).map(|k| (k.to_string(), v.clone())))
        .collect()
}

impl TableSchema {
    /// Encode attribute values into metadata.
    ///
    /// Null values are treated as unset and omitted. Fails with a validation error if a value is
    /// not valid for its declared type or fails its validator, if a key is not an attribute of
    /// this schema, or if a required attribute has no value.
    pub fn encode_metadata(&self, values: &AttributeValues) -> TabulaResult<Metadata> {
        let mut metadata = Metadata::new();
        for (key, value) in values {
            let Some(field) = self.resolve_attribute(key) else {
                tabula_bail!(Validation: "{} has no attribute {}", self.name(), key);
            };
            if value.is_null() {
                if !field.is_nullable() && field.default_value().is_none() {
                    tabula_bail!(Validation: "attribute {} is not nullable", key);
                }
                continue;
            }
            if let Some(validator) = field.validator() {
                validator.check(key, value)?;
            }
            let attribute_type = field
                .as_attribute()
                .ok_or_else(|| tabula_err!(AssertionFailed: "{} resolved to a non-attribute", key))?;
            let bytes = attribute_type
                .to_bytes(value)
                .map_err(|e| e.with_context(format!("attribute {key}")))?;
            metadata.insert(key.clone(), bytes);
        }
        self.check_required(&metadata)?;
        Ok(metadata)
    }

    /// Decode metadata into attribute values.
    ///
    /// Only attributes present in `metadata` are returned; defaults are not materialised. Keys
    /// that are not attributes of this schema are ignored.
    pub fn decode_metadata(&self, metadata: &Metadata) -> TabulaResult<AttributeValues> {
        self.check_required(metadata)?;
        self.decode_present(metadata)
    }

    /// Overlay `overrides` on the attributes already in `base` and encode the result.
    ///
    /// A null override unsets the attribute.
    pub fn merge_metadata(
        &self,
        base: &Metadata,
        overrides: &AttributeValues,
    ) -> TabulaResult<Metadata> {
        let mut values = self.decode_present(base)?;
        values.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.encode_metadata(&values)
    }

    fn decode_present(&self, metadata: &Metadata) -> TabulaResult<AttributeValues> {
        let mut values = AttributeValues::new();
        for (key, raw) in metadata {
            let Some(attribute_type) = self.resolve_attribute(key).and_then(|f| f.as_attribute())
            else {
                log::debug!("{}: ignoring unknown metadata key {}", self.name(), key);
                continue;
            };
            let value = attribute_type
                .from_bytes(raw)
                .map_err(|e| e.with_context(format!("attribute {key}")))?;
            values.insert(key.clone(), value);
        }
        Ok(values)
    }

    /// Decode and re-encode `metadata`, dropping unknown keys.
    ///
    /// This is how every table constructor checks the metadata it is given.
    pub fn normalize_metadata(&self, metadata: &Metadata) -> TabulaResult<Metadata> {
        self.encode_metadata(&self.decode_metadata(metadata)?)
    }

    /// The value of attribute `key` in `metadata`.
    ///
    /// Unset attributes yield their default, or null when nullable.
    pub fn attribute_value(&self, metadata: &Metadata, key: &str) -> TabulaResult<ScalarValue> {
        let field = self
            .resolve_attribute(key)
            .ok_or_else(|| tabula_err!("{} has no attribute {}", self.name(), key))?;
        let attribute_type = field
            .as_attribute()
            .ok_or_else(|| tabula_err!(AssertionFailed: "{} resolved to a non-attribute", key))?;
        match metadata.get(key) {
            Some(raw) => attribute_type.from_bytes(raw),
            None => match field.default_value() {
                Some(default) => Ok(default.clone()),
                None if field.is_nullable() => Ok(ScalarValue::Null),
                None => Err(tabula_err!(
                    Validation: "attribute {} is not set and has no default",
                    key
                )),
            },
        }
    }

    /// Every attribute set in `metadata`, at any depth, in string form.
    ///
    /// Unset attributes are omitted; reading the strings back leaves them unset, so their
    /// defaults still apply.
    pub fn string_attributes(&self, metadata: &Metadata) -> TabulaResult<BTreeMap<String, String>> {
        let mut strings = BTreeMap::new();
        for key in self.attribute_keys() {
            if !metadata.contains_key(key) {
                continue;
            }
            let attribute_type = self
                .resolve_attribute(key)
                .and_then(|f| f.as_attribute())
                .ok_or_else(|| tabula_err!(AssertionFailed: "{} resolved to a non-attribute", key))?;
            let value = self.attribute_value(metadata, key)?;
            strings.insert(key.clone(), attribute_type.to_string_form(&value)?);
        }
        Ok(strings)
    }

    /// Parse attributes from their string forms.
    pub fn values_from_strings(
        &self,
        strings: &BTreeMap<String, String>,
    ) -> TabulaResult<AttributeValues> {
        let mut values = AttributeValues::new();
        for (key, raw) in strings {
            let attribute_type = self
                .resolve_attribute(key)
                .and_then(|f| f.as_attribute())
                .ok_or_else(|| tabula_err!(Validation: "{} has no attribute {}", self.name(), key))?;
            values.insert(key.clone(), attribute_type.from_string_form(raw)?);
        }
        Ok(values)
    }

    /// Lower metadata to string-valued arrow schema metadata. Values are hex encoded.
    pub fn to_arrow_metadata(&self, metadata: &Metadata) -> HashMap<String, String> {
        metadata
            .iter()
            .map(|(k, v)| (k.clone(), hex::encode(v)))
            .collect()
    }

    /// Lift string-valued arrow schema metadata written by [`TableSchema::to_arrow_metadata`].
    ///
    /// Keys that are not attributes of this schema are dropped. The result is not checked for
    /// required attributes; table constructors do that once explicit values are merged in.
    pub fn from_arrow_metadata(&self, metadata: &HashMap<String, String>) -> TabulaResult<Metadata> {
        let mut lifted = Metadata::new();
        for (key, value) in metadata {
            if !self.attribute_keys().contains(key) {
                log::debug!("{}: dropping arrow metadata key {}", self.name(), key);
                continue;
            }
            lifted.insert(key.clone(), Bytes::from(hex::decode(value)?));
        }
        Ok(lifted)
    }

    fn check_required(&self, metadata: &Metadata) -> TabulaResult<()> {
        for key in self.attribute_keys() {
            if metadata.contains_key(key) {
                continue;
            }
            if self.resolve_attribute(key).is_some_and(|f| f.is_required()) {
                tabula_bail!(Validation: "{}: missing required attribute {}", self.name(), key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_schema::DataType;
    use rstest::rstest;
    use tabula_expr::lt;

    use super::*;
    use crate::{AttributeType, FieldDescriptor, TableSchemaRef};

    fn leaf(name: &str) -> TableSchemaRef {
        Arc::new(
            TableSchema::compile(
                name,
                [
                    FieldDescriptor::column("x", DataType::Int64),
                    FieldDescriptor::attribute("id1", AttributeType::Utf8),
                ],
            )
            .unwrap(),
        )
    }

    fn outer() -> TableSchema {
        let middle = Arc::new(
            TableSchema::compile(
                "Middle",
                [
                    FieldDescriptor::subtable("inner", leaf("Inner")),
                    FieldDescriptor::attribute("id2", AttributeType::Utf8),
                    FieldDescriptor::attribute("count", AttributeType::int(4, false).unwrap())
                        .nullable(),
                ],
            )
            .unwrap(),
        );
        TableSchema::compile(
            "Outer",
            [
                FieldDescriptor::subtable("middle", middle),
                FieldDescriptor::attribute("id3", AttributeType::Utf8),
                FieldDescriptor::attribute("ratio", AttributeType::FLOAT64)
                    .with_default(0.5)
                    .with_validator(lt(1.0)),
            ],
        )
        .unwrap()
    }

    fn values(entries: &[(&str, ScalarValue)]) -> AttributeValues {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn nested_encoding() {
        let schema = outer();
        let metadata = schema
            .encode_metadata(&values(&[
                ("id3", "c".into()),
                ("middle.id2", "b".into()),
                ("middle.inner.id1", "a".into()),
            ]))
            .unwrap();
        let expected: Metadata = [
            ("id3", "c"),
            ("middle.id2", "b"),
            ("middle.inner.id1", "a"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Bytes::from(v)))
        .collect();
        assert_eq!(metadata, expected);
    }

    #[test]
    fn round_trip_at_depth() {
        let schema = outer();
        let input = values(&[
            ("id3", "c".into()),
            ("ratio", 0.25.into()),
            ("middle.id2", "b".into()),
            ("middle.count", 7u32.into()),
            ("middle.inner.id1", "a".into()),
        ]);
        let decoded = schema
            .decode_metadata(&schema.encode_metadata(&input).unwrap())
            .unwrap();
        assert_eq!(decoded, input);
    }

    #[rstest]
    #[case::missing_required(&[("id3", ScalarValue::from("c")), ("middle.id2", ScalarValue::from("b"))])]
    #[case::wrong_type(&[("id3", ScalarValue::from(1i64)), ("middle.id2", ScalarValue::from("b")), ("middle.inner.id1", ScalarValue::from("a"))])]
    #[case::validator(&[("id3", ScalarValue::from("c")), ("ratio", ScalarValue::from(2.0)), ("middle.id2", ScalarValue::from("b")), ("middle.inner.id1", ScalarValue::from("a"))])]
    #[case::unknown_key(&[("id3", ScalarValue::from("c")), ("middle.id3", ScalarValue::from("b")), ("middle.id2", ScalarValue::from("b")), ("middle.inner.id1", ScalarValue::from("a"))])]
    fn encode_rejects(#[case] entries: &[(&str, ScalarValue)]) {
        let err = outer().encode_metadata(&values(entries)).unwrap_err();
        assert!(err.is_validation_error(), "{err}");
    }

    #[test]
    fn decode_rejects_malformed_values() {
        let schema = leaf("Leaf");
        let metadata: Metadata = [("id1".to_string(), Bytes::from_static(&[0xff]))].into();
        assert!(schema.decode_metadata(&metadata).unwrap_err().is_validation_error());
        assert!(schema.decode_metadata(&Metadata::new()).unwrap_err().is_validation_error());
    }

    #[test]
    fn defaults_and_nulls() {
        let schema = outer();
        let metadata = schema
            .encode_metadata(&values(&[
                ("id3", "c".into()),
                ("middle.id2", "b".into()),
                ("middle.inner.id1", "a".into()),
            ]))
            .unwrap();
        assert_eq!(
            schema.attribute_value(&metadata, "ratio").unwrap(),
            ScalarValue::from(0.5)
        );
        assert!(schema.attribute_value(&metadata, "middle.count").unwrap().is_null());
        assert!(schema.attribute_value(&metadata, "nope").is_err());
    }

    #[test]
    fn merge_overrides_and_unsets() {
        let schema = outer();
        let base = schema
            .encode_metadata(&values(&[
                ("id3", "c".into()),
                ("ratio", 0.25.into()),
                ("middle.id2", "b".into()),
                ("middle.inner.id1", "a".into()),
            ]))
            .unwrap();
        let merged = schema
            .merge_metadata(
                &base,
                &values(&[("id3", "z".into()), ("ratio", ScalarValue::Null)]),
            )
            .unwrap();
        assert_eq!(merged.get("id3"), Some(&Bytes::from("z")));
        assert!(!merged.contains_key("ratio"));
        assert_eq!(merged.get("middle.id2"), Some(&Bytes::from("b")));

        let unset_required = schema.merge_metadata(&base, &values(&[("id3", ScalarValue::Null)]));
        assert!(unset_required.unwrap_err().is_validation_error());
    }

    #[test]
    fn prefixing() {
        let inner: Metadata = [("id1".to_string(), Bytes::from("a"))].into();
        let prefixed = prefix_metadata("inner", &inner);
        assert!(prefixed.contains_key("inner.id1"));
        let mut parent = prefix_metadata("middle", &prefixed);
        parent.insert("middle2.id1".to_string(), Bytes::from("z"));
        parent.insert("id2".to_string(), Bytes::from("b"));
        assert_eq!(strip_metadata_prefix("middle", &parent), prefixed);
        assert_eq!(
            strip_metadata_prefix("inner", &strip_metadata_prefix("middle", &parent)),
            inner
        );
    }

    #[test]
    fn string_forms() {
        let schema = outer();
        let metadata = schema
            .encode_metadata(&values(&[
                ("id3", "c".into()),
                ("middle.id2", "b".into()),
                ("middle.inner.id1", "a".into()),
            ]))
            .unwrap();
        let strings = schema.string_attributes(&metadata).unwrap();
        assert_eq!(strings.get("id3").map(String::as_str), Some("c"));
        assert!(!strings.contains_key("ratio"));
        assert!(!strings.contains_key("middle.count"));

        let parsed = schema
            .encode_metadata(&schema.values_from_strings(&strings).unwrap())
            .unwrap();
        assert_eq!(
            schema.attribute_value(&parsed, "middle.inner.id1").unwrap(),
            ScalarValue::from("a")
        );
        assert_eq!(
            schema.attribute_value(&parsed, "ratio").unwrap(),
            ScalarValue::from(0.5)
        );
    }

    #[test]
    fn arrow_metadata_round_trip() {
        let schema = leaf("Leaf");
        let metadata: Metadata = [("id1".to_string(), Bytes::from("a"))].into();
        let mut lowered = schema.to_arrow_metadata(&metadata);
        assert_eq!(lowered.get("id1").map(String::as_str), Some("61"));
        lowered.insert("pandas".to_string(), "{}".to_string());
        assert_eq!(schema.from_arrow_metadata(&lowered).unwrap(), metadata);
    }
}
