use std::sync::Arc;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use scale_info::{meta_type, PortableRegistry, Registry, TypeInfo};

use phat_abi_form::abi::substrate::ContractAbi;
use phat_abi_form::form::validator::validate;
use phat_abi_form::{FieldValue, FormError, FormNormalized, TypeDef, TypeDefInfo, TypeRegistry, Value};

#[allow(dead_code)]
#[derive(TypeInfo)]
struct AccountId([u8; 32]);

#[allow(dead_code)]
#[derive(TypeInfo)]
struct Transfer {
    to: AccountId,
    amount: u128,
    memo: Option<String>,
    data: Vec<u8>,
    hops: Vec<u32>,
    key: [u8; 4],
    pair: (u8, bool),
}

#[allow(dead_code)]
#[derive(TypeInfo)]
enum Command {
    Stop,
    Move(u8),
    Jump(u8, u8),
    Goto { x: u32 },
}

/// A registry whose first entry, id 0, is `T`.
fn registry<T: TypeInfo + 'static>() -> PortableRegistry {
    let mut registry = Registry::new();
    registry.register_type(&meta_type::<T>());
    registry.into()
}

fn json(text: &str) -> Value {
    Value::parse_json(text).unwrap()
}

fn fixture() -> String {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/demo.json").to_string()
}

#[test]
fn registry_types_become_type_defs() {
    let registry = registry::<Transfer>();
    let ty = registry.lookup_type_def(0).unwrap();

    assert_eq!(ty.info, TypeDefInfo::Struct);

    let fields: Vec<(String, TypeDefInfo)> = ty
        .sub_multiple()
        .unwrap()
        .iter()
        .map(|field| {
            let resolved = field.resolve(&registry).unwrap();
            (resolved.name.clone().unwrap(), resolved.info)
        })
        .collect();

    assert_eq!(
        fields,
        vec![
            ("to".to_string(), TypeDefInfo::Plain),
            ("amount".to_string(), TypeDefInfo::Plain),
            ("memo".to_string(), TypeDefInfo::Option),
            ("data".to_string(), TypeDefInfo::Plain),
            ("hops".to_string(), TypeDefInfo::Vec),
            ("key".to_string(), TypeDefInfo::VecFixed),
            ("pair".to_string(), TypeDefInfo::Tuple),
        ]
    );

    let resolve = |index: usize| ty.sub_multiple().unwrap()[index].resolve(&registry).unwrap().into_owned();

    assert_eq!(resolve(0).type_name, "AccountId");
    assert_eq!(resolve(1).type_name, "u128");
    assert_eq!(resolve(3).type_name, "Bytes");
    assert_eq!(resolve(5).length, Some(4));
    assert_eq!(resolve(6).sub_multiple().unwrap().len(), 2);

    let memo = resolve(2);
    assert_eq!(memo.sub_single().unwrap().resolve(&registry).unwrap().type_name, "Text");
}

#[test]
fn validates_against_a_registry() {
    let registry = registry::<Transfer>();

    let input: Value = r#"{
        "to": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
        "amount": "1000",
        "memo": "",
        "data": "[1,2]",
        "hops": [1, 2],
        "key": "[1,2,3,4]",
        "pair": [1, "true"]
    }"#
    .into();

    let validated = validate(&TypeDef::lookup(0), &input, &registry).unwrap();
    assert_eq!(validated.errors, Vec::<String>::new());
    assert_eq!(
        validated.value.unwrap(),
        json(
            r#"{
            "to": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
            "amount": 1000,
            "memo": null,
            "data": [1, 2],
            "hops": [1, 2],
            "key": [1, 2, 3, 4],
            "pair": [1, true]
        }"#
        )
    );

    let input: Value = r#"{"to": "x", "amount": "-5", "memo": "hi", "data": "", "hops": [], "key": "[1]", "pair": [1, 2]}"#.into();
    let validated = validate(&TypeDef::lookup(0), &input, &registry).unwrap();
    assert_eq!(
        validated.errors,
        vec![
            "\"-5\" must be a number >= 0".to_string(),
            "This field is required".to_string(),
            "Expected 4 items, got 1".to_string(),
        ]
    );
}

#[test]
fn enum_variants_from_registry() {
    let registry = Arc::new(registry::<Command>());

    let ty = registry.lookup_type_def(0).unwrap();
    assert_eq!(ty.info, TypeDefInfo::Enum);

    let check = |text: &str| validate(&TypeDef::lookup(0), &text.into(), registry.as_ref()).unwrap();

    assert_eq!(check("Stop").value, Some(json(r#"{"Stop": null}"#)));
    assert_eq!(check(r#"{"Move": 3}"#).value, Some(json(r#"{"Move": 3}"#)));
    assert_eq!(check(r#"{"Jump": [1, 2]}"#).value, Some(json(r#"{"Jump": [1, 2]}"#)));
    assert_eq!(check(r#"{"Goto": {"x": 9}}"#).value, Some(json(r#"{"Goto": {"x": 9}}"#)));
    assert_eq!(
        check("Fly").errors,
        vec!["Variant \"Fly\" not found, expected one of: Stop, Move, Jump, Goto".to_string()]
    );

    let mut form = FormNormalized::new(vec![("cmd".to_string(), TypeDef::lookup(0))], registry).unwrap();
    let root = form.root("cmd").unwrap();

    // Move, Jump and Goto carry payloads
    assert_eq!(form.field(root).unwrap().enum_fields.as_ref().unwrap().len(), 3);

    let goto = form.select_variant(root, "Goto").unwrap().unwrap();
    let x = match &form.field(goto).unwrap().value {
        FieldValue::Map(fields) => fields["x"],
        other => panic!("not a struct: {other:?}"),
    };
    form.dispatch(phat_abi_form::Action::SetValue {
        uid: x,
        value: FieldValue::Scalar("9".into()),
    })
    .unwrap();

    let checked = form.checked().unwrap();
    assert!(!checked.is_invalid());
    assert_eq!(checked.form_value()["cmd"], json(r#"{"Goto": {"x": 9}}"#));
}

#[test]
fn loads_contract_metadata() {
    let abi = ContractAbi::load(fixture()).unwrap();

    assert_eq!(abi.name, None);
    assert_eq!(
        abi.messages.iter().map(|m| m.label.as_str()).collect::<Vec<_>>(),
        vec!["flip", "set_point", "configure"]
    );
    assert_eq!(abi.constructors[0].label, "new");

    let configure = abi.find("configure").unwrap();
    assert!(configure.payable);
    assert_eq!(abi.display_type(&configure.args[1]), "Option");

    let form = abi.form(configure).unwrap();
    let kinds: Vec<TypeDefInfo> = form
        .form_data
        .values()
        .map(|uid| form.field(*uid).unwrap().type_def.info)
        .collect();
    assert_eq!(
        kinds,
        vec![TypeDefInfo::Enum, TypeDefInfo::Option, TypeDefInfo::Vec]
    );

    let mut input = IndexMap::new();
    input.insert("mode".to_string(), Value::from("Off"));
    input.insert("tags".to_string(), Value::from("[1,2]"));

    let validated = abi.validate_args(configure, &input).unwrap();
    assert_eq!(validated["mode"].value, Some(json(r#"{"Off": null}"#)));
    assert_eq!(validated["limit"].value, Some(Value::Null));
    assert_eq!(validated["tags"].value, Some(json("[1,2]")));

    assert_eq!(
        abi.find("nope").err(),
        Some(FormError::UnknownMessage("nope".into()))
    );
}

#[test]
fn metadata_wrappers_and_errors() {
    let text = std::fs::read_to_string(fixture()).unwrap();

    let wrapped = format!("{{\"V3\": {text}}}");
    let abi = ContractAbi::from_json(&wrapped).unwrap();
    assert_eq!(abi.messages.len(), 3);

    assert_eq!(
        ContractAbi::from_json("[]").err(),
        Some(FormError::Metadata("expected a JSON object".into()))
    );
    assert_eq!(
        ContractAbi::from_json("{}").err(),
        Some(FormError::Metadata("missing `spec` section".into()))
    );
}
