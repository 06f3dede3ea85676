use schematree::tree::{FieldRef, JoinKind, Tree, TreeError};
use schematree::{EntityKey, SchemaCatalog};

use super::fixtures::{catalog, GENERIC_YAML, PROXY_YAML, SPECIMEN_YAML, STUDY_YAML};

fn on(tree: &Tree, target: &EntityKey) -> Vec<Vec<(String, String)>> {
    tree.synthesize_joins(target, None)
        .unwrap()
        .into_iter()
        .map(|j| j.on)
        .collect()
}

fn pair(left: &str, right: &str) -> (String, String) {
    (left.to_string(), right.to_string())
}

#[test]
fn test_non_default_primary_key_columns() {
    let tree = Tree::for_root(catalog(SPECIMEN_YAML), "Specimen").unwrap();
    let link = EntityKey::new("regressions", "Link");
    let subject = EntityKey::new("regressions", "Subject");

    let joins = tree.synthesize_joins(&link, None).unwrap();
    assert_eq!(
        joins[0].to_string(),
        r#"LEFT OUTER JOIN "link" ON ("specimen"."ALIQUOT_ID" = "link"."ALIQUOT_ID")"#
    );

    // Each hop keeps its own join kind; the required Link -> Subject hop is inner.
    let joins = tree.synthesize_joins(&subject, None).unwrap();
    assert_eq!(joins.len(), 2);
    assert_eq!(joins[1].kind, JoinKind::Inner);
    assert_eq!(
        joins[1].to_string(),
        r#"INNER JOIN "subject" ON ("link"."study_id" = "subject"."study_id")"#
    );
}

#[test]
fn test_foreign_key_to_unique_field() {
    let catalog = catalog(STUDY_YAML);
    let a = EntityKey::new("regressions", "A");
    let b = EntityKey::new("regressions", "B");

    let from_a = Tree::for_root(catalog.clone(), "A").unwrap();
    assert_eq!(on(&from_a, &b), vec![vec![pair("study_id", "study_id")]]);

    let from_b = Tree::for_root(catalog, "B").unwrap();
    assert_eq!(on(&from_b, &a), vec![vec![pair("study_id", "study_id")]]);
}

#[test]
fn test_custom_bridge_table() {
    let catalog = catalog(STUDY_YAML);
    let b = EntityKey::new("regressions", "B");
    let c = EntityKey::new("regressions", "C");

    let from_c = Tree::for_root(catalog.clone(), "C").unwrap();
    let joins = from_c.synthesize_joins(&b, None).unwrap();
    assert_eq!(joins[0].table, "cb");
    assert_eq!(
        on(&from_c, &b),
        vec![
            vec![pair("c_id", "some_c_id")],
            vec![pair("study_id", "study_id")],
        ]
    );

    let from_b = Tree::for_root(catalog, "B").unwrap();
    assert_eq!(
        on(&from_b, &c),
        vec![
            vec![pair("study_id", "study_id")],
            vec![pair("some_c_id", "c_id")],
        ]
    );
}

#[test]
fn test_proxy_field_routed_through_representation() {
    let tree = Tree::for_root(catalog(PROXY_YAML), "Root").unwrap();
    let target = EntityKey::new("proxy", "Target");
    let proxy = EntityKey::new("proxy", "TargetProxy");
    let non_proxy = EntityKey::new("proxy", "TargetNonProxy");

    let field = FieldRef::new(target.clone(), "id");
    assert_eq!(tree.render_lookup(&field, None, None).unwrap(), "standard_path__id");
    assert_eq!(
        tree.render_lookup(&field, None, Some(&proxy)).unwrap(),
        "proxy_path__id"
    );

    // a separately stored entity is not a representation of Target
    assert!(matches!(
        tree.render_lookup(&field, None, Some(&non_proxy)),
        Err(TreeError::InvalidLookup { .. })
    ));
}

#[test]
fn test_proxy_inherits_fields_and_forward_relationships() {
    let catalog = catalog(PROXY_YAML);
    let proxy = EntityKey::new("proxy", "TargetProxy");
    let target = EntityKey::new("proxy", "Target");

    assert_eq!(catalog.concrete_key(&proxy).unwrap(), target);
    assert_eq!(
        catalog.get_fields(&proxy).unwrap(),
        catalog.get_fields(&target).unwrap()
    );

    let tree = Tree::for_root(catalog, "TargetProxy").unwrap();
    let other = tree.entity("OtherModel").unwrap();
    assert_eq!(tree.query_string(&other).unwrap(), "m2m");
}

#[test]
fn test_relationship_across_namespaces() {
    let tree = Tree::for_root(catalog(GENERIC_YAML), "generic.GenericModel").unwrap();
    let content_type = tree.entity("ContentType").unwrap();
    assert_eq!(content_type.namespace, "contenttypes");

    let field = FieldRef::new(content_type, "id");
    assert_eq!(tree.render_lookup(&field, None, None).unwrap(), "content_type__id");
}
