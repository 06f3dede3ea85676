//! Route policy: which edges may be used to reach an entity.
//!
//! A tree consults an ordered [`RouterChain`] of [`RoutePolicy`] objects; the
//! first policy with an opinion wins. [`RouteRules`] is the declarative
//! policy built from required/excluded route definitions.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::errors::{TreeError, TreeResult};
use crate::schema_catalog::{EntityKey, SchemaCatalog};

/// A tree as declared in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeDefinition {
    /// Root entity, qualified or bare
    pub root: String,
    #[serde(default)]
    pub excluded_entities: Vec<String>,
    #[serde(default)]
    pub required_routes: Vec<RouteDefinition>,
    #[serde(default)]
    pub excluded_routes: Vec<RouteDefinition>,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_self_joins")]
    pub self_joins: bool,
}

fn default_self_joins() -> bool {
    true
}

impl TreeDefinition {
    pub fn for_root(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            self_joins: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub source: String,
    pub target: String,
    /// Accessor on the source entity, optionally written `Entity.accessor`
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub symmetrical: bool,
}

impl RouteDefinition {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            field: None,
            symmetrical: false,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn symmetrical(mut self) -> Self {
        self.symmetrical = true;
        self
    }
}

/// A resolved route between two entities, optionally narrowed to one accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub source: EntityKey,
    pub target: EntityKey,
    pub field: Option<String>,
}

impl Route {
    pub fn new(source: EntityKey, target: EntityKey, field: Option<String>) -> Self {
        Self {
            source,
            target,
            field,
        }
    }

    pub fn resolve(def: &RouteDefinition, catalog: &dyn SchemaCatalog) -> TreeResult<Self> {
        let source = catalog.resolve_entity_by_name(&def.source, None)?.key.clone();
        let target = catalog.resolve_entity_by_name(&def.target, None)?.key.clone();
        let field = def.field.as_deref().map(|f| match f.rsplit_once('.') {
            Some((_, accessor)) => accessor.to_string(),
            None => f.to_string(),
        });
        Ok(Self::new(source, target, field))
    }

    fn mirror(&self) -> Self {
        Self::new(self.target.clone(), self.source.clone(), None)
    }

    fn matches(&self, source: &EntityKey, target: &EntityKey, field: Option<&str>) -> bool {
        self.source == *source
            && self.target == *target
            && self.field.as_deref().is_none_or(|f| Some(f) == field)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)?;
        if let Some(field) = &self.field {
            write!(f, " via {}", field)?;
        }
        Ok(())
    }
}

/// The only source (and optionally accessor) allowed to reach a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredSource {
    pub source: EntityKey,
    pub field: Option<String>,
}

/// Routing hook consulted while a tree is built.
///
/// Every method defaults to `None`, meaning "no opinion"; the next policy in
/// the chain is asked.
pub trait RoutePolicy: Send + Sync + fmt::Debug {
    fn required_source(&self, _target: &EntityKey, _root: &EntityKey) -> Option<RequiredSource> {
        None
    }

    fn allow_route(
        &self,
        _source: &EntityKey,
        _target: &EntityKey,
        _field: Option<&str>,
        _root: &EntityKey,
    ) -> Option<bool> {
        None
    }
}

/// Declarative required/excluded routes.
#[derive(Debug, Clone, Default)]
pub struct RouteRules {
    required: HashMap<EntityKey, Route>,
    excluded: Vec<Route>,
}

impl RouteRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(
        required: &[RouteDefinition],
        excluded: &[RouteDefinition],
        catalog: &dyn SchemaCatalog,
    ) -> TreeResult<Self> {
        let mut rules = Self::new();
        for def in required {
            rules.require(Route::resolve(def, catalog)?, def.symmetrical)?;
        }
        for def in excluded {
            rules.exclude(Route::resolve(def, catalog)?, def.symmetrical);
        }
        Ok(rules)
    }

    /// Register a required route. A target may be required at most once;
    /// any second entry that is not identical fails, including the mirror
    /// inserted for a symmetrical route.
    pub fn require(&mut self, route: Route, symmetrical: bool) -> TreeResult<()> {
        if symmetrical {
            self.insert_required(route.mirror())?;
        }
        self.insert_required(route)
    }

    fn insert_required(&mut self, route: Route) -> TreeResult<()> {
        match self.required.get(&route.target) {
            Some(existing) if *existing == route => Ok(()),
            Some(existing) => Err(TreeError::route_conflict(
                &route.target,
                format!("required as `{}` and as `{}`", existing, route),
            )),
            None => {
                self.required.insert(route.target.clone(), route);
                Ok(())
            }
        }
    }

    pub fn exclude(&mut self, route: Route, symmetrical: bool) {
        if symmetrical {
            self.excluded.push(route.mirror());
        }
        self.excluded.push(route);
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty()
    }
}

impl RoutePolicy for RouteRules {
    fn required_source(&self, target: &EntityKey, _root: &EntityKey) -> Option<RequiredSource> {
        self.required.get(target).map(|route| RequiredSource {
            source: route.source.clone(),
            field: route.field.clone(),
        })
    }

    fn allow_route(
        &self,
        source: &EntityKey,
        target: &EntityKey,
        field: Option<&str>,
        _root: &EntityKey,
    ) -> Option<bool> {
        self.excluded
            .iter()
            .any(|route| route.matches(source, target, field))
            .then_some(false)
    }
}

/// Ordered policies; the first `Some` answer wins.
#[derive(Debug, Clone, Default)]
pub struct RouterChain {
    policies: Vec<Arc<dyn RoutePolicy>>,
}

impl RouterChain {
    pub fn new(policies: Vec<Arc<dyn RoutePolicy>>) -> Self {
        Self { policies }
    }

    pub fn push(&mut self, policy: Arc<dyn RoutePolicy>) {
        self.policies.push(policy);
    }

    pub fn prepend(&mut self, policy: Arc<dyn RoutePolicy>) {
        self.policies.insert(0, policy);
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl RoutePolicy for RouterChain {
    fn required_source(&self, target: &EntityKey, root: &EntityKey) -> Option<RequiredSource> {
        self.policies
            .iter()
            .find_map(|p| p.required_source(target, root))
    }

    fn allow_route(
        &self,
        source: &EntityKey,
        target: &EntityKey,
        field: Option<&str>,
        root: &EntityKey,
    ) -> Option<bool> {
        self.policies
            .iter()
            .find_map(|p| p.allow_route(source, target, field, root))
    }
}

/// Routing decisions for one tree: the policy chain plus the tree's root
/// and globally excluded entities.
#[derive(Debug, Clone)]
pub struct TreeRouter {
    root: EntityKey,
    excluded_entities: HashSet<EntityKey>,
    chain: RouterChain,
    self_joins: bool,
}

impl TreeRouter {
    pub fn new(root: EntityKey) -> Self {
        Self {
            root,
            excluded_entities: HashSet::new(),
            chain: RouterChain::default(),
            self_joins: true,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn RoutePolicy>) -> Self {
        self.chain.push(policy);
        self
    }

    pub fn with_excluded_entities(mut self, entities: impl IntoIterator<Item = EntityKey>) -> Self {
        self.excluded_entities.extend(entities);
        self
    }

    pub fn with_self_joins(mut self, enabled: bool) -> Self {
        self.self_joins = enabled;
        self
    }

    /// Router for a configured tree; the definition's rules become the last
    /// policy of the chain.
    pub fn from_definition(def: &TreeDefinition, catalog: &dyn SchemaCatalog) -> TreeResult<Self> {
        let root = catalog.resolve_entity_by_name(&def.root, None)?.key.clone();
        let excluded = def
            .excluded_entities
            .iter()
            .map(|name| Ok(catalog.resolve_entity_by_name(name, None)?.key.clone()))
            .collect::<TreeResult<Vec<_>>>()?;
        let rules = RouteRules::from_definitions(&def.required_routes, &def.excluded_routes, catalog)?;

        let mut router = Self::new(root)
            .with_excluded_entities(excluded)
            .with_self_joins(def.self_joins);
        if !rules.is_empty() {
            router = router.with_policy(Arc::new(rules));
        }
        Ok(router)
    }

    pub fn root(&self) -> &EntityKey {
        &self.root
    }

    pub fn chain_mut(&mut self) -> &mut RouterChain {
        &mut self.chain
    }

    pub fn is_excluded(&self, entity: &EntityKey) -> bool {
        self.excluded_entities.contains(entity)
    }

    /// Whether `target` may be reached from `source` (through `field`, the
    /// accessor on `source`).
    pub fn allow(&self, source: &EntityKey, target: &EntityKey, field: Option<&str>) -> bool {
        if target == source || self.is_excluded(target) || *target == self.root {
            return false;
        }

        let verdict = self.chain.allow_route(source, target, field, &self.root);
        if verdict == Some(false) {
            return false;
        }

        if let Some(required) = self.chain.required_source(target, &self.root) {
            let field_ok = required.field.as_deref().is_none_or(|f| Some(f) == field);
            if required.source != *source || !field_ok {
                log::debug!(
                    "Route {} -> {} rejected, {} is required",
                    source,
                    target,
                    required.source
                );
                return false;
            }
        }
        true
    }

    /// Whether a self-referential edge may add a self-join leaf.
    pub fn allow_self_join(&self, entity: &EntityKey, field: &str) -> bool {
        self.self_joins
            && !self.is_excluded(entity)
            && self.chain.allow_route(entity, entity, Some(field), &self.root) != Some(false)
    }
}
