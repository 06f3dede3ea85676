use schematree::tree::{preview, Tree, TreeDefinition, TreeError};
use schematree::{CatalogError, EntityKey};

use super::fixtures::{catalog, COMPANY_YAML, PROXY_YAML};

fn office_tree() -> Tree {
    let def = TreeDefinition {
        self_joins: false,
        ..TreeDefinition::for_root("tree.Office")
    };
    Tree::from_definition(catalog(COMPANY_YAML), &def).unwrap()
}

#[test]
fn test_office_tree_preview() {
    let tree = office_tree();
    assert_eq!(
        preview::render(&tree),
        "Office\n....Employee\n........Project\n........Title\n....Meeting\n"
    );
    assert_eq!(tree.to_string(), preview::render(&tree));
}

#[test]
fn test_shallower_claim_replaces_deeper() {
    // Meeting is first found below Employee, then directly from Office.
    let tree = office_tree();
    let meeting = tree.entity("Meeting").unwrap();
    let node = tree.node_for(&meeting).unwrap();
    assert_eq!(node.depth, 1);
    assert_eq!(node.parent, Some(tree.root().id));
    assert_eq!(tree.len(), 5);
}

#[test]
fn test_employee_tree_with_self_joins() {
    let tree = Tree::for_root(catalog(COMPANY_YAML), "Employee").unwrap();
    assert_eq!(
        preview::render(&tree),
        "Employee\n....Project\n....Meeting\n....Title\n....Office\n....Employee\n....Employee\n"
    );

    let leaves: Vec<&str> = tree
        .children(tree.root().id)
        .filter(|n| n.self_join)
        .filter_map(|n| n.accessor())
        .collect();
    assert_eq!(leaves, vec!["manager", "managed_employees"]);

    // self-join leaves are not indexed
    assert_eq!(tree.len(), 5);
    let employee = tree.entity("Employee").unwrap();
    assert!(tree.node_for(&employee).unwrap().is_root());
}

#[test]
fn test_nodes_are_preorder_with_consistent_links() {
    let tree = office_tree();
    for (pos, node) in tree.nodes().enumerate() {
        assert_eq!(node.id.index(), pos);
        if let Some(parent) = node.parent {
            assert!(parent.index() < pos);
            assert_eq!(tree.node(parent).depth + 1, node.depth);
            assert!(tree.node(parent).children.contains(&node.id));
        }
    }
}

#[test]
fn test_max_depth_limits_discovery() {
    let def = TreeDefinition {
        max_depth: Some(1),
        self_joins: false,
        ..TreeDefinition::for_root("Office")
    };
    let tree = Tree::from_definition(catalog(COMPANY_YAML), &def).unwrap();
    assert_eq!(preview::render(&tree), "Office\n....Employee\n....Meeting\n");

    let err = tree.entity("Title").unwrap_err();
    assert!(matches!(err, TreeError::EntityNotInTree { .. }));
}

#[test]
fn test_excluded_entity_is_unreachable() {
    let def = TreeDefinition {
        excluded_entities: vec!["Title".to_string()],
        ..TreeDefinition::for_root("Office")
    };
    let tree = Tree::from_definition(catalog(COMPANY_YAML), &def).unwrap();
    let title = EntityKey::new("tree", "Title");
    assert!(!tree.contains(&title));
    assert!(matches!(
        tree.resolve_path(&title, None),
        Err(TreeError::EntityNotInTree { .. })
    ));
}

#[test]
fn test_entity_name_resolution() {
    let tree = office_tree();
    assert_eq!(tree.entity("title").unwrap(), EntityKey::new("tree", "Title"));
    assert_eq!(
        tree.entity("tree.Title").unwrap(),
        EntityKey::new("tree", "Title")
    );
    assert_eq!(
        tree.entity_in("TITLE", Some("tree")).unwrap(),
        EntityKey::new("tree", "Title")
    );

    match tree.entity("Nope") {
        Err(TreeError::Catalog(CatalogError::EntityNotFound { name })) => assert_eq!(name, "Nope"),
        other => panic!("expected EntityNotFound, got {:?}", other),
    }
}

#[test]
fn test_unknown_root_fails() {
    let err = Tree::for_root(catalog(COMPANY_YAML), "Nope").unwrap_err();
    assert!(matches!(
        err,
        TreeError::Catalog(CatalogError::EntityNotFound { .. })
    ));
}

#[test]
fn test_proxy_and_concrete_are_distinct_nodes() {
    let tree = Tree::for_root(catalog(PROXY_YAML), "Root").unwrap();
    let target = tree.node_for(&EntityKey::new("proxy", "Target")).unwrap();
    let proxy = tree.node_for(&EntityKey::new("proxy", "TargetProxy")).unwrap();

    assert_eq!(target.related_name(), Some("standard_path"));
    assert_eq!(proxy.related_name(), Some("proxy_path"));
    assert_eq!(target.table, proxy.table);
}

#[test]
fn test_trees_are_deterministic() {
    let first = preview::render(&Tree::for_root(catalog(COMPANY_YAML), "Project").unwrap());
    for _ in 0..5 {
        let again = preview::render(&Tree::for_root(catalog(COMPANY_YAML), "Project").unwrap());
        assert_eq!(first, again);
    }
}

#[test]
fn test_path_length_matches_depth() {
    let tree = Tree::for_root(catalog(COMPANY_YAML), "Title").unwrap();
    for node in tree.nodes().filter(|n| !n.self_join) {
        let path = tree.resolve_path(&node.entity, None).unwrap();
        assert_eq!(path.len(), node.depth);
        match path.last() {
            Some(last) => assert_eq!(last.entity, node.entity),
            None => assert!(node.is_root()),
        }
    }
}
