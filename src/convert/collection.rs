use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use super::Converter;
use crate::data::Data;
use crate::descriptor::FieldDescriptor;
use crate::error::ConvertError;
use crate::record::RecordRef;

impl Converter<'_> {
    /// Resolves the elements of a sequence- or mapping-typed field.
    ///
    /// A raw value whose shape does not fit the descriptor (an object for a
    /// sequence field, say) comes back unconverted.
    pub(crate) fn coerce_collection(
        &self,
        descriptor: &FieldDescriptor,
        raw: &Value,
    ) -> Result<Data, ConvertError> {
        let candidates = descriptor.candidates.as_deref().unwrap_or_default();
        match raw {
            Value::Array(items) if descriptor.is_sequence => items
                .iter()
                .map(|item| self.coerce_element(&descriptor.name, candidates, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Data::List),
            Value::Object(entries) if descriptor.is_mapping => entries
                .iter()
                .map(|(key, item)| -> Result<(String, Data), ConvertError> {
                    let value = self.coerce_element(&descriptor.name, candidates, item)?;
                    Ok((key.clone(), value))
                })
                .collect::<Result<IndexMap<_, _>, _>>()
                .map(Data::Map),
            other => Ok(Data::from(other)),
        }
    }

    /// First candidate that converts wins. Nulls are never tried.
    fn coerce_element(
        &self,
        field: &str,
        candidates: &[RecordRef],
        element: &Value,
    ) -> Result<Data, ConvertError> {
        if element.is_null() || candidates.is_empty() {
            return Ok(Data::from(element));
        }

        let mut failures = Vec::new();
        for candidate in candidates {
            match self.convert_value(candidate, element) {
                Ok(instance) => return Ok(Data::from(instance)),
                Err(error) if error.is_candidate_rejection() => {
                    debug!(field, candidate = candidate.name(), %error, "candidate rejected");
                    if self.options.strict {
                        failures.extend(error.messages());
                    }
                }
                Err(error) => return Err(error),
            }
        }

        if self.options.strict {
            return Err(ConvertError::TypeMismatch(failures));
        }
        debug!(field, "no candidate matched, keeping element unconverted");
        Ok(Data::from(element))
    }
}

#[cfg(test)]
mod tests {
    use crate::convert::Converter;
    use crate::data::Data;
    use crate::error::ConvertError;
    use crate::record::{RecordRef, RecordType};
    use crate::registry::Registry;
    use crate::ty::TypeExpr;
    use serde_json::json;

    fn point() -> RecordRef {
        RecordType::builder("Point")
            .field("x", TypeExpr::Int)
            .field("y", TypeExpr::Int)
            .build()
    }

    fn label() -> RecordRef {
        RecordType::builder("Label")
            .field("text", TypeExpr::Str)
            .build()
    }

    fn shapes(point: &RecordRef, label: &RecordRef) -> RecordRef {
        RecordType::builder("Shapes")
            .field(
                "items",
                TypeExpr::list(TypeExpr::optional(TypeExpr::union([
                    TypeExpr::record(point),
                    TypeExpr::record(label),
                ]))),
            )
            .build()
    }

    #[test]
    fn union_elements_fall_back_to_later_candidates() {
        let registry = Registry::new();
        let (p, l) = (point(), label());
        let ty = shapes(&p, &l);
        let out = Converter::new(&registry)
            .convert(&ty, &json!({"items": [{"x": 1, "y": 2}, null, {"text": "hi"}]}))
            .unwrap();
        let items = out.get("items").and_then(Data::as_list).unwrap();
        assert!(items[0].as_instance().unwrap().is_a(&p));
        assert!(items[1].is_null());
        assert!(items[2].as_instance().unwrap().is_a(&l));
    }

    #[test]
    fn strict_falls_back_to_a_later_candidate() {
        let registry = Registry::new();
        let (p, l) = (point(), label());
        let ty = shapes(&p, &l);
        let out = Converter::new(&registry)
            .strict(true)
            .convert(&ty, &json!({"items": [{"text": "hi"}, {"x": 1, "y": 2}]}))
            .unwrap();
        let items = out.get("items").and_then(Data::as_list).unwrap();
        let first = items[0].as_instance().unwrap();
        assert!(first.is_a(&l));
        assert_eq!(first.get("text"), Some(&Data::from("hi")));
        assert!(items[1].as_instance().unwrap().is_a(&p));
    }

    #[test]
    fn first_match_wins_even_when_a_later_candidate_fits_better() {
        let registry = Registry::new();
        let loose = RecordType::builder("Loose")
            .field_with_default("x", TypeExpr::Any, Data::Null)
            .build();
        let tight = point();
        let ty = RecordType::builder("Holder")
            .field(
                "items",
                TypeExpr::list(TypeExpr::union([
                    TypeExpr::record(&loose),
                    TypeExpr::record(&tight),
                ])),
            )
            .build();
        let out = Converter::new(&registry)
            .convert(&ty, &json!({"items": [{"x": 1, "y": 2}]}))
            .unwrap();
        let items = out.get("items").and_then(Data::as_list).unwrap();
        assert!(items[0].as_instance().unwrap().is_a(&loose));
    }

    #[test]
    fn lenient_keeps_unmatched_elements_raw() {
        let registry = Registry::new();
        let (p, l) = (point(), label());
        let ty = shapes(&p, &l);
        let out = Converter::new(&registry)
            .convert(&ty, &json!({"items": [{"z": 0}, 7, "s"]}))
            .unwrap();
        assert_eq!(out.get("items"), Some(&Data::from(json!([{"z": 0}, 7, "s"]))));
    }

    #[test]
    fn strict_aggregates_every_candidate_failure() {
        let registry = Registry::new();
        let (p, l) = (point(), label());
        let ty = shapes(&p, &l);
        let err = Converter::new(&registry)
            .strict(true)
            .convert(&ty, &json!({"items": [{"x": "1", "y": 2}]}))
            .unwrap_err();
        let ConvertError::TypeMismatch(messages) = err else {
            panic!("expected a type mismatch");
        };
        assert_eq!(
            messages,
            [
                r#"field `Point.x`: value "1" does not match expected type int"#,
                "record `Label` is missing required field(s): text",
            ]
        );
    }

    #[test]
    fn mapping_preserves_keys_and_nulls() {
        let registry = Registry::new();
        let p = point();
        let ty = RecordType::builder("Grid")
            .field(
                "cells",
                TypeExpr::optional(TypeExpr::map(TypeExpr::Str, TypeExpr::optional(TypeExpr::record(&p)))),
            )
            .build();
        let out = Converter::new(&registry)
            .strict(true)
            .convert(&ty, &json!({"cells": {"b": {"x": 1, "y": 1}, "a": null}}))
            .unwrap();
        let cells = out.get("cells").and_then(Data::as_map).unwrap();
        assert_eq!(cells.keys().collect::<Vec<_>>(), ["b", "a"]);
        assert!(cells["b"].as_instance().unwrap().is_a(&p));
        assert!(cells["a"].is_null());
    }

    #[test]
    fn shape_mismatch_is_left_alone() {
        let registry = Registry::new();
        let p = point();
        let ty = RecordType::builder("Path")
            .field("points", TypeExpr::list(TypeExpr::record(&p)))
            .build();
        let out = Converter::new(&registry)
            .convert(&ty, &json!({"points": {"x": 1, "y": 2}}))
            .unwrap();
        assert_eq!(out.get("points"), Some(&Data::from(json!({"x": 1, "y": 2}))));

        let err = Converter::new(&registry)
            .strict(true)
            .convert(&ty, &json!({"points": {"x": 1, "y": 2}}))
            .unwrap_err();
        assert!(err.to_string().contains("list[Point]"));
    }

    #[test]
    fn scalar_elements_without_candidates_are_never_errors() {
        let registry = Registry::new();
        let ty = RecordType::builder("Tags")
            .field("tags", TypeExpr::list(TypeExpr::Str))
            .build();
        let out = Converter::new(&registry)
            .convert(&ty, &json!({"tags": ["a", 1]}))
            .unwrap();
        assert_eq!(out.get("tags"), Some(&Data::from(json!(["a", 1]))));

        // strict still checks the final value structurally
        let err = Converter::new(&registry)
            .strict(true)
            .convert(&ty, &json!({"tags": ["a", 1]}))
            .unwrap_err();
        assert!(err.to_string().contains("Tags.tags"));
    }
}
