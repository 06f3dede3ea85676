use schematree::tree::{Tree, TreeDefinition, TreeError};
use schematree::{CatalogError, EntityKey};
use test_case::test_case;

use super::fixtures::{catalog, COMPANY_YAML};

fn key(name: &str) -> EntityKey {
    EntityKey::new("tree", name)
}

fn tree(root: &str) -> Tree {
    let def = TreeDefinition {
        self_joins: false,
        ..TreeDefinition::for_root(format!("tree.{}", root))
    };
    Tree::from_definition(catalog(COMPANY_YAML), &def).unwrap()
}

fn lookup(tree: &Tree, entity: &str, field: &str) -> String {
    let field = tree.field(&key(entity), field).unwrap();
    tree.render_lookup(&field, None, None).unwrap()
}

#[test_case("Office", "Office", "location", "location")]
#[test_case("Office", "Title", "salary", "employee__title__salary")]
#[test_case("Office", "Project", "name", "employee__project__name")]
#[test_case("Office", "Meeting", "start_time", "meeting__start_time")]
#[test_case("Title", "Office", "location", "employee__office__location")]
#[test_case("Title", "Project", "name", "employee__project__name")]
#[test_case("Title", "Meeting", "start_time", "employee__meeting__start_time")]
#[test_case("Project", "Office", "location", "employees__office__location")]
#[test_case("Project", "Title", "salary", "employees__title__salary")]
#[test_case("Project", "Meeting", "start_time", "meeting__start_time")]
#[test_case("Meeting", "Title", "salary", "attendees__title__salary")]
#[test_case("Meeting", "Project", "name", "project__name")]
#[test_case("Meeting", "Office", "location", "office__location")]
#[test_case("Employee", "Office", "location", "office__location")]
fn test_field_lookups(root: &str, entity: &str, field: &str, expected: &str) {
    assert_eq!(lookup(&tree(root), entity, field), expected);
}

#[test]
fn test_lookup_with_operator() {
    let employee = tree("Employee");
    let field = employee.field(&key("Office"), "location").unwrap();
    assert_eq!(
        employee.render_lookup(&field, Some("iexact"), None).unwrap(),
        "office__location__iexact"
    );
}

#[test]
fn test_query_string() {
    let office = tree("Office");
    assert_eq!(office.query_string(&key("Office")).unwrap(), "");
    assert_eq!(office.query_string(&key("Title")).unwrap(), "employee__title");
    assert_eq!(office.query_string(&key("Meeting")).unwrap(), "meeting");
}

#[test]
fn test_forward_relationship_field() {
    let office = tree("Office");
    assert_eq!(lookup(&office, "Employee", "title"), "employee__title");
}

#[test]
fn test_reverse_field_renders_own_name() {
    let employee = tree("Employee");
    assert_eq!(lookup(&employee, "Employee", "managed_employees"), "managed_employees");
    assert_eq!(lookup(&employee, "Employee", "project_set"), "project");
}

#[test]
fn test_disabled_reverse_field() {
    let employee = tree("Employee");
    let field = employee.field(&key("Employee"), "managed_projects").unwrap();
    assert!(matches!(
        employee.render_lookup(&field, None, None),
        Err(TreeError::InvalidLookup { .. })
    ));
}

#[test]
fn test_unknown_field() {
    let office = tree("Office");
    assert!(matches!(
        office.field(&key("Office"), "nope"),
        Err(TreeError::Catalog(CatalogError::FieldNotFound { .. }))
    ));
}

#[test_case("location", "location")]
#[test_case("employee__id", "employee__id")]
#[test_case("tree__employee__id", "employee__id")]
#[test_case("title__id", "employee__title__id")]
#[test_case("tree__title__id", "employee__title__id")]
#[test_case("title__salary", "employee__title__salary")]
#[test_case("title__salary__gte", "employee__title__salary__gte")]
#[test_case("tree__project__employees", "employee__project__employees")]
#[test_case("meeting__office", "meeting__office")]
fn test_resolve_lookup_office(input: &str, expected: &str) {
    assert_eq!(tree("Office").resolve_lookup(input).unwrap(), expected);
}

#[test_case("office" ; "root entity")]
#[test_case("tree__office" ; "qualified root entity")]
#[test_case("office__id" ; "root entity field")]
#[test_case("name" ; "unknown name")]
#[test_case("employees" ; "field of another entity")]
#[test_case("manager" ; "relationship of another entity")]
#[test_case("title__nope" ; "unknown field on target")]
#[test_case("employee____id" ; "empty segment")]
fn test_resolve_lookup_office_invalid(input: &str) {
    assert!(matches!(
        tree("Office").resolve_lookup(input),
        Err(TreeError::InvalidLookup { .. })
    ));
}

#[test_case("id")]
#[test_case("first_name")]
#[test_case("title")]
#[test_case("office")]
#[test_case("manager")]
#[test_case("managed_employees")]
#[test_case("project")]
#[test_case("meeting")]
fn test_resolve_lookup_employee_local(input: &str) {
    assert_eq!(tree("Employee").resolve_lookup(input).unwrap(), input);
}

#[test]
fn test_resolve_lookup_disabled_accessor() {
    assert!(matches!(
        tree("Employee").resolve_lookup("managed_projects"),
        Err(TreeError::InvalidLookup { .. })
    ));
}

#[test]
fn test_resolve_lookup_unreachable_entity() {
    let def = TreeDefinition {
        excluded_entities: vec!["Title".to_string()],
        ..TreeDefinition::for_root("Office")
    };
    let tree = Tree::from_definition(catalog(COMPANY_YAML), &def).unwrap();
    assert!(matches!(
        tree.resolve_lookup("title__salary"),
        Err(TreeError::InvalidLookup { .. })
    ));
}
