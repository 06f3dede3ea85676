//! Shared catalogs for integration tests.

use std::sync::Arc;

use schematree::schema_catalog::{CatalogConfig, SchemaCatalog};

/// Office / Title / Employee / Project / Meeting.
pub const COMPANY_YAML: &str = r#"
name: company
schema:
  entities:
    - namespace: tree
      name: Office
      fields:
        - { name: location }
    - namespace: tree
      name: Title
      fields:
        - { name: name }
        - { name: salary }
    - namespace: tree
      name: Employee
      fields:
        - { name: first_name, column: firstName }
        - { name: last_name }
      relationships:
        - { name: title, kind: foreign_key, target: Title }
        - { name: office, kind: foreign_key, target: Office }
        - { name: manager, kind: foreign_key, target: self, nullable: true, related_name: managed_employees }
    - namespace: tree
      name: Project
      fields:
        - { name: name }
        - { name: due_date }
      relationships:
        - { name: employees, kind: many_to_many, target: Employee }
        - { name: manager, kind: foreign_key, target: Employee, related_name: "managed_projects+" }
    - namespace: tree
      name: Meeting
      fields:
        - { name: start_time }
        - { name: end_time }
      relationships:
        - { name: attendees, kind: many_to_many, target: Employee }
        - { name: project, kind: foreign_key, target: Project, nullable: true }
        - { name: office, kind: foreign_key, target: Office }
trees:
  default:
    root: tree.Employee
  office:
    root: Office
    self_joins: false
  project:
    root: tree.Project
"#;

/// Route graph:
///
/// ```text
///         A
///        / \
///       B   C
///      / \ /
///     G   D
///     |  / \
///     | E   F
///     |  \ / \
///     |   J   |
///     |   |   |
///     |   K   |
///      \     /
///       H----
///       |
///       I
/// ```
pub const ROUTES_YAML: &str = r#"
name: routes
schema:
  entities:
    - { namespace: tests, name: A }
    - namespace: tests
      name: B
      relationships:
        - { name: a, kind: foreign_key, target: A }
    - namespace: tests
      name: C
      relationships:
        - { name: a, kind: foreign_key, target: A }
    - namespace: tests
      name: D
      relationships:
        - { name: b, kind: foreign_key, target: B }
        - { name: c, kind: foreign_key, target: C }
    - namespace: tests
      name: E
      relationships:
        - { name: d, kind: many_to_many, target: D }
        - { name: d1, kind: many_to_many, target: D, related_name: e1_set }
    - namespace: tests
      name: F
      relationships:
        - { name: d, kind: one_to_one, target: D }
    - namespace: tests
      name: G
      relationships:
        - { name: b, kind: foreign_key, target: B }
    - namespace: tests
      name: H
      relationships:
        - { name: g, kind: foreign_key, target: G }
        - { name: f, kind: foreign_key, target: F }
    - namespace: tests
      name: I
      relationships:
        - { name: i, kind: many_to_many, target: H }
    - namespace: tests
      name: J
      relationships:
        - { name: f, kind: foreign_key, target: F }
        - { name: e, kind: foreign_key, target: E }
    - namespace: tests
      name: K
      relationships:
        - { name: j, kind: foreign_key, target: J }
"#;

/// Non-default primary key columns.
pub const SPECIMEN_YAML: &str = r#"
name: specimens
schema:
  entities:
    - namespace: regressions
      name: Specimen
      table: specimen
      primary_key: ALIQUOT_ID
      fields:
        - { name: aliquot_id, column: ALIQUOT_ID }
    - namespace: regressions
      name: Subject
      table: subject
      fields:
        - { name: study_id, column: study_id, primary_key: true }
    - namespace: regressions
      name: Link
      table: link
      primary_key: ALIQUOT_ID
      relationships:
        - { name: aliquot_id, kind: foreign_key, target: Specimen, column: ALIQUOT_ID }
        - { name: study_id, kind: foreign_key, target: Subject, column: study_id }
"#;

/// Foreign keys to a non-primary unique field and a custom bridge table.
pub const STUDY_YAML: &str = r#"
name: studies
schema:
  entities:
    - namespace: regressions
      name: A
      table: a
      fields:
        - { name: study_id }
    - namespace: regressions
      name: B
      table: b
      relationships:
        - { name: study_id, kind: foreign_key, target: A, to_field: study_id, column: study_id }
    - namespace: regressions
      name: C
      table: c
      fields:
        - { name: id, column: c_id, primary_key: true }
      relationships:
        - name: bs
          kind: many_to_many
          target: B
          through:
            table: cb
            source_column: some_c_id
            target_column: study_id
            target_key: study_id
"#;

/// Proxy and multi-table representations of one entity.
pub const PROXY_YAML: &str = r#"
name: proxies
schema:
  entities:
    - { namespace: proxy, name: OtherModel }
    - namespace: proxy
      name: Target
      relationships:
        - { name: other_model, kind: one_to_one, target: OtherModel }
        - { name: m2m, kind: many_to_many, target: OtherModel }
        - { name: fk, kind: foreign_key, target: OtherModel }
    - { namespace: proxy, name: TargetProxy, proxy_of: Target }
    - namespace: proxy
      name: TargetNonProxy
      relationships:
        - { name: target_ptr, kind: one_to_one, target: Target, column: target_ptr_id, related_name: targetnonproxy }
    - namespace: proxy
      name: Root
      relationships:
        - { name: standard_path, kind: many_to_many, target: Target, related_name: path }
        - { name: proxy_path, kind: many_to_many, target: TargetProxy, related_name: proxy }
        - { name: non_proxy_path, kind: many_to_many, target: TargetNonProxy, related_name: non_proxy }
"#;

/// Relationship into another namespace.
pub const GENERIC_YAML: &str = r#"
name: generic
schema:
  entities:
    - { namespace: contenttypes, name: ContentType, fields: [{ name: app_label }, { name: model }] }
    - namespace: generic
      name: GenericModel
      fields:
        - { name: object_id, nullable: true }
      relationships:
        - { name: content_type, kind: foreign_key, target: contenttypes.ContentType, nullable: true }
"#;

pub fn load(yaml: &str) -> CatalogConfig {
    CatalogConfig::from_yaml_str(yaml).expect("fixture YAML should parse")
}

pub fn catalog(yaml: &str) -> Arc<dyn SchemaCatalog> {
    Arc::new(load(yaml).build_catalog().expect("fixture catalog should build"))
}

/// Two-column primary key reached by a foreign key and a bridge table.
pub const COMPOSITE_YAML: &str = r#"
name: composite
schema:
  entities:
    - namespace: composite
      name: A
      table: a
      primary_key: [x, y]
      fields:
        - { name: x }
        - { name: y }
    - namespace: composite
      name: B
      table: b
      relationships:
        - { name: a, kind: foreign_key, target: A, column: [ax, ay] }
        - { name: many, kind: many_to_many, target: A, related_name: many_bs }
"#;
