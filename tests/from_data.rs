use indexmap::IndexMap;
use json_dataclass::{
    ConvertError, Data, Instance, Record, RecordRef, RecordType, Registry, TypeExpr, ValueKind,
    from_data, from_data_with,
};
use once_cell::sync::Lazy;
use serde_json::json;

static MOCK: Lazy<RecordRef> = Lazy::new(|| {
    RecordType::builder("MockDataclass")
        .field("a", TypeExpr::Int)
        .field("b", TypeExpr::optional(TypeExpr::Str))
        .field_with_default("c", TypeExpr::Str, "hello world")
        .build()
});

static PARENT: Lazy<RecordRef> = Lazy::new(|| {
    RecordType::builder("ParentMockDataclass")
        .field("a", TypeExpr::Int)
        .field("child", TypeExpr::record(&MOCK))
        .build()
});

static DICT_PARENT: Lazy<RecordRef> = Lazy::new(|| {
    RecordType::builder("DictParentMockDataclass")
        .field("a", TypeExpr::Int)
        .field(
            "child",
            TypeExpr::optional(TypeExpr::map(TypeExpr::Str, TypeExpr::optional(TypeExpr::record(&MOCK)))),
        )
        .build()
});

static LIST_PARENT: Lazy<RecordRef> = Lazy::new(|| {
    RecordType::builder("ListParentMockDataclass")
        .field("a", TypeExpr::Int)
        .field("child", TypeExpr::list(TypeExpr::optional(TypeExpr::record(&MOCK))))
        .build()
});

fn mock(a: impl Into<Data>, b: impl Into<Data>) -> Record {
    let mut values = IndexMap::new();
    values.insert("a".to_string(), a.into());
    values.insert("b".to_string(), b.into());
    Record::construct(&MOCK, values).unwrap()
}

fn parent(ty: &RecordRef, a: i64, child: impl Into<Data>) -> Instance {
    let mut values = IndexMap::new();
    values.insert("a".to_string(), Data::from(a));
    values.insert("child".to_string(), child.into());
    Instance::from(Record::construct(ty, values).unwrap())
}

#[test]
fn converts_recognized_fields() {
    let actual = from_data(&MOCK, &json!({"a": 1, "b": null})).unwrap();
    assert_eq!(actual, Instance::from(mock(1, Data::Null)));
}

#[test]
fn type_checking_not_enforced_by_default() {
    let actual = from_data(&MOCK, &json!({"a": "1", "b": 1})).unwrap();
    assert_eq!(actual, Instance::from(mock("1", 1)));
}

#[test]
fn type_checking_enforced_when_strict() {
    let err = from_data_with(&MOCK, &json!({"a": "1", "b": 1}), true, true).unwrap_err();
    assert!(matches!(&err, ConvertError::TypeMismatch(messages) if messages.len() == 2));
}

#[test]
fn extra_fields_not_ignored() {
    let actual = from_data_with(&MOCK, &json!({"a": 1, "b": null, "d": "goodbye world!"}), false, false).unwrap();
    assert_eq!(actual.record(), &mock(1, Data::Null));
    assert_eq!(actual.get("d"), Some(&Data::from("goodbye world!")));
    assert_eq!(actual.extra_fields(), [("d".to_string(), ValueKind::Str)]);
}

#[test]
fn extra_fields_not_ignored_multiple() {
    let data = json!({"a": 1, "b": null, "d": "goodbye world!", "e": [1, 2, 3]});
    let single = from_data_with(&MOCK, &json!({"a": 1, "b": null, "d": "x"}), false, false).unwrap();
    let actual = from_data_with(&MOCK, &data, false, false).unwrap();

    assert_eq!(actual.get("d"), Some(&Data::from("goodbye world!")));
    assert_eq!(actual.get("e"), Some(&Data::from(json!([1, 2, 3]))));
    assert_eq!(
        actual.extra_fields(),
        [("d".to_string(), ValueKind::Str), ("e".to_string(), ValueKind::List)]
    );
    let (single, multiple) = (single.as_extended().unwrap(), actual.as_extended().unwrap());
    assert!(!std::sync::Arc::ptr_eq(single.extension(), multiple.extension()));
}

#[test]
fn extension_types_are_shared_between_calls() {
    let registry = Registry::new();
    let converter = json_dataclass::Converter::new(&registry).ignore_extra(false);
    let first = converter.convert(&MOCK, &json!({"a": 1, "b": null, "d": 1})).unwrap();
    let second = converter.convert(&MOCK, &json!({"d": 2, "b": "x", "a": 3})).unwrap();
    assert!(std::sync::Arc::ptr_eq(
        first.as_extended().unwrap().extension(),
        second.as_extended().unwrap().extension(),
    ));
    assert_eq!(registry.extension_count(), 1);
}

#[test]
fn nesting_support() {
    let actual = from_data(&PARENT, &json!({"a": 0, "child": {"a": 1, "b": "1"}})).unwrap();
    assert_eq!(actual, parent(&PARENT, 0, mock(1, "1")));
}

#[test]
fn dict_nesting_support() {
    let actual = from_data(&DICT_PARENT, &json!({"a": 0, "child": {"1": {"a": 1, "b": "1"}, "2": null}})).unwrap();
    let mut child = IndexMap::new();
    child.insert("1".to_string(), Data::from(mock(1, "1")));
    child.insert("2".to_string(), Data::Null);
    assert_eq!(actual, parent(&DICT_PARENT, 0, Data::Map(child)));
}

#[test]
fn dict_nesting_support_strict() {
    let err = from_data_with(&DICT_PARENT, &json!({"a": 0, "child": {"1": {"a": 1, "b": 1}}}), true, true).unwrap_err();
    assert!(matches!(err, ConvertError::TypeMismatch(_)));
}

#[test]
fn list_nesting_support() {
    let actual = from_data(&LIST_PARENT, &json!({"a": 0, "child": [{"a": 1, "b": "1"}, null]})).unwrap();
    assert_eq!(
        actual,
        parent(&LIST_PARENT, 0, Data::List(vec![Data::from(mock(1, "1")), Data::Null]))
    );
}

#[test]
fn list_nesting_support_strict() {
    let err = from_data_with(&LIST_PARENT, &json!({"a": 0, "child": [{"a": 1, "b": 1}]}), true, true).unwrap_err();
    assert!(err.to_string().contains("MockDataclass.b"));
}

#[test]
fn nested_extras_are_kept_when_requested() {
    let actual = from_data_with(
        &LIST_PARENT,
        &json!({"a": 0, "child": [{"a": 1, "b": null, "z": true}]}),
        false,
        false,
    )
    .unwrap();
    let child = actual.get("child").and_then(Data::as_list).unwrap()[0]
        .as_instance()
        .unwrap();
    assert!(child.is_a(&MOCK));
    assert_eq!(child.extra_fields(), [("z".to_string(), ValueKind::Bool)]);
}

#[test]
fn repeated_conversion_hits_the_descriptor_cache() {
    let registry = Registry::new();
    let converter = json_dataclass::Converter::new(&registry);
    let data = json!({"a": 0, "child": {"a": 1, "b": "1"}});
    let first = converter.convert(&PARENT, &data).unwrap();
    let cached = registry.descriptors(&PARENT);
    let second = converter.convert(&PARENT, &data).unwrap();
    assert_eq!(first, second);
    assert!(std::sync::Arc::ptr_eq(&cached, &registry.descriptors(&PARENT)));
    assert_eq!(registry.descriptor_count(), 2); // parent + child
}
