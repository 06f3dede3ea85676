use schematree::tree::{LookupFilter, Tree, TreeDefinition, TreeError};
use serde_json::json;

use super::fixtures::{catalog, COMPANY_YAML};

fn tree(root: &str) -> Tree {
    let def = TreeDefinition {
        self_joins: false,
        ..TreeDefinition::for_root(format!("tree.{}", root))
    };
    Tree::from_definition(catalog(COMPANY_YAML), &def).unwrap()
}

#[test]
fn test_condition_on_root_field() {
    let filter = LookupFilter::condition("location", "Outer Space");
    let resolved = filter.resolve(&tree("Office")).unwrap();
    assert_eq!(resolved.to_string(), "(AND: ('location', 'Outer Space'))");
}

#[test]
fn test_condition_rewritten_through_tree() {
    let employee = tree("Employee");
    let filter = LookupFilter::condition("office__location", "Outer Space");
    assert_eq!(
        filter.resolve(&employee).unwrap().to_string(),
        "(AND: ('office__location', 'Outer Space'))"
    );

    let project = tree("Project");
    let filter = LookupFilter::condition("title__salary", 100000);
    assert_eq!(
        filter.resolve(&project).unwrap().to_string(),
        "(AND: ('employees__title__salary', 100000))"
    );
}

#[test]
fn test_or_combination() {
    let project = tree("Project");
    let filter = LookupFilter::condition("title__salary", 100000)
        | LookupFilter::condition("office__location", "Outer Space");
    assert_eq!(
        filter.resolve(&project).unwrap().to_string(),
        "(OR: ('employees__title__salary', 100000), ('employees__office__location', 'Outer Space'))"
    );
}

#[test]
fn test_operator_suffix_kept() {
    let employee = tree("Employee");
    let filter = LookupFilter::condition("office__location__iexact", "outer space");
    let resolved = filter.resolve(&employee).unwrap();
    assert_eq!(resolved.lookups(), vec!["office__location__iexact"]);
}

#[test]
fn test_nested_groups_and_negation() {
    let office = tree("Office");
    let filter = LookupFilter::all([("title__salary", json!(100000)), ("location", json!("Mars"))])
        & !(LookupFilter::condition("meeting__end_time", json!(null))
            | LookupFilter::condition("employee__last_name", json!(["Smith", "Jones"])));

    let resolved = filter.resolve(&office).unwrap();
    assert_eq!(
        resolved.to_string(),
        concat!(
            "(AND: ('employee__title__salary', 100000), ('location', 'Mars'), ",
            "(NOT (OR: ('meeting__end_time', None), ('employee__last_name', ['Smith', 'Jones']))))"
        )
    );
    assert_eq!(
        resolved.lookups(),
        vec![
            "employee__title__salary",
            "location",
            "meeting__end_time",
            "employee__last_name"
        ]
    );
}

#[test]
fn test_boolean_values() {
    let filter = LookupFilter::condition("a", true) & LookupFilter::condition("b", false);
    assert_eq!(filter.to_string(), "(AND: ('a', True), ('b', False))");
}

#[test]
fn test_invalid_lookup_fails_whole_filter() {
    let office = tree("Office");
    let filter = LookupFilter::condition("location", "Mars") & LookupFilter::condition("nope", 1);
    assert!(matches!(
        filter.resolve(&office),
        Err(TreeError::InvalidLookup { .. })
    ));
}
