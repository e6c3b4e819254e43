use super::*;
use pretty_assertions::assert_eq;

#[test]
fn effective_limit_prefers_positive_declared_limit() {
    let spec = ParameterSpec::new("user", "User", "app.Users").with_limit(5);
    assert_eq!(spec.effective_limit(DEFAULT_PROVIDER_LIMIT), 5);
}

#[test]
fn effective_limit_falls_back_to_global() {
    let absent = ParameterSpec::new("user", "User", "app.Users");
    let zero = ParameterSpec::new("user", "User", "app.Users").with_limit(0);
    assert_eq!(absent.effective_limit(100), 100);
    assert_eq!(zero.effective_limit(42), 42);
}

#[test]
fn qualified_name_includes_container_chain() {
    let desc = FunctionDescriptor::new("card", "app.ui")
        .in_container(ContainerKind::Singleton, &["Previews", "Cards"]);
    assert_eq!(desc.container_path(), "app.ui.Previews.Cards");
    assert_eq!(desc.qualified_name(), "app.ui.Previews.Cards.card");
}

#[test]
fn qualified_name_without_module() {
    let desc = FunctionDescriptor::new("main", "");
    assert_eq!(desc.qualified_name(), "main");
}

#[test]
fn params_keep_declaration_order() {
    let desc = FunctionDescriptor::new("greet", "app")
        .with_param(ParameterSpec::new("name", "String", "app.Names"))
        .with_param(ParameterSpec::new("count", "Int", "app.Counts"));
    assert_eq!(desc.arity(), 2);
    assert!(desc.is_parameterized());
    assert_eq!(desc.param_names(), vec!["name", "count"]);
}

#[test]
fn descriptor_from_minimal_json() {
    let json = r#"{"name":"card","module_path":"app"}"#;
    let desc: FunctionDescriptor = serde_json::from_str(json).unwrap();
    assert_eq!(desc.kind, ContainerKind::FreeFunction);
    assert!(desc.params.is_empty());
}

#[test]
fn descriptor_kind_uses_snake_case() {
    let json = r#"{
        "name": "card",
        "module_path": "app",
        "containers": ["Previews"],
        "kind": "instantiable",
        "params": [{"name": "n", "type_name": "Int", "provider": "app.Ints", "limit": 3}]
    }"#;
    let desc: FunctionDescriptor = serde_json::from_str(json).unwrap();
    assert_eq!(desc.kind, ContainerKind::Instantiable);
    assert_eq!(desc.params[0].limit, Some(3));
}
