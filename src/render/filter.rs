//! Output filters: kind restriction, class hierarchy and heritage pruning.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::walk;
use crate::config::RenderOptions;
use crate::model::{Component, ComponentKind, Composite, HeritagePair, Namespace};

/// `(qualified name, origin file)` identifying one modelled type.
pub type TypeKey = (String, String);

#[derive(Debug, Clone)]
struct IndexedType {
    name: String,
    kind: ComponentKind,
    heritage: Vec<HeritagePair>,
}

/// Every class, interface and enum of a model by qualified name and file.
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    types: IndexMap<TypeKey, IndexedType>,
}

impl TypeIndex {
    pub fn new(model: &[Component]) -> Self {
        let mut types = IndexMap::new();
        walk(model, &mut |component, qualified| {
            let (Some(file), kind) = (component.file(), component.kind()) else {
                return;
            };
            if matches!(kind, ComponentKind::Class | ComponentKind::Interface | ComponentKind::Enum) {
                types.insert(
                    (qualified.to_string(), file.to_string()),
                    IndexedType {
                        name: component.name().to_string(),
                        kind,
                        heritage: component.heritage().into_iter().cloned().collect(),
                    },
                );
            }
        });
        Self { types }
    }

    pub fn contains(&self, name: &str, file: &str) -> bool {
        self.types.contains_key(&(name.to_string(), file.to_string()))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Keys whose qualified or simple name equals `name`.
    fn lookup(&self, name: &str) -> Vec<TypeKey> {
        self.types
            .iter()
            .filter(|((qualified, _), t)| qualified == name || t.name == name)
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn parents(&self, key: &TypeKey) -> Vec<TypeKey> {
        self.types
            .get(key)
            .map(|t| {
                t.heritage
                    .iter()
                    .filter(|pair| !pair.is_empty())
                    .map(|pair| (pair.name.clone(), pair.file.clone()))
                    .filter(|parent| self.types.contains_key(parent))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A class or interface plus its transitive ancestors and descendants.
    pub fn hierarchy(&self, target: &str) -> HashSet<TypeKey> {
        let roots: Vec<TypeKey> = self
            .lookup(target)
            .into_iter()
            .filter(|key| self.types[key].kind != ComponentKind::Enum)
            .collect();
        let mut keep: HashSet<TypeKey> = roots.iter().cloned().collect();

        let mut queue: VecDeque<TypeKey> = roots.iter().cloned().collect();
        while let Some(key) = queue.pop_front() {
            for parent in self.parents(&key) {
                if keep.insert(parent.clone()) {
                    queue.push_back(parent);
                }
            }
        }

        let mut descendants: HashSet<TypeKey> = roots.iter().cloned().collect();
        let mut queue: VecDeque<TypeKey> = roots.into_iter().collect();
        while let Some(key) = queue.pop_front() {
            for child in self.types.keys() {
                if !descendants.contains(child) && self.parents(child).contains(&key) {
                    descendants.insert(child.clone());
                    queue.push_back(child.clone());
                }
            }
        }
        keep.extend(descendants);
        keep
    }
}

/// Apply the kind and hierarchy filters, then prune dangling heritage pairs.
pub fn filter_model(model: &[Component], options: &RenderOptions) -> Vec<Component> {
    let full = TypeIndex::new(model);

    let hierarchy = options.target_class.as_deref().map(|target| {
        let keep = full.hierarchy(target);
        if keep.is_empty() {
            warn!(target, "target class not found in the model");
        }
        keep
    });

    let retained = retain(model, &mut Vec::new(), &|component, qualified| {
        let kind = component.kind();
        if options.only_interfaces && kind != ComponentKind::Interface {
            return false;
        }
        if options.only_classes && kind != ComponentKind::Class {
            return false;
        }
        match (&hierarchy, component.file()) {
            (Some(keep), Some(file)) => keep.contains(&(qualified.to_string(), file.to_string())),
            (Some(_), None) => false,
            (None, _) => true,
        }
    });

    let kept = TypeIndex::new(&retained);
    debug!(before = full.len(), after = kept.len(), "filtered model");
    prune_heritage(retained, &full, &kept)
}

/// Keep the leaves accepted by `accept`; namespaces survive while they hold
/// a retained node.
fn retain<'a>(
    components: &'a [Component],
    scope: &mut Vec<&'a str>,
    accept: &dyn Fn(&Component, &str) -> bool,
) -> Vec<Component> {
    let mut result = Vec::new();
    for component in components {
        scope.push(component.name());
        match component {
            Component::Namespace(namespace) => {
                let parts = retain(&namespace.parts, scope, accept);
                if !parts.is_empty() {
                    result.push(Component::Namespace(Namespace {
                        name: namespace.name.clone(),
                        file: namespace.file.clone(),
                        parts,
                    }));
                }
            }
            other => {
                if accept(other, &scope.join(".")) {
                    result.push(other.clone());
                }
            }
        }
        scope.pop();
    }
    result
}

/// Drop empty pairs and pairs naming a modelled type that was filtered out.
fn prune_heritage(components: Vec<Component>, full: &TypeIndex, kept: &TypeIndex) -> Vec<Component> {
    let keep_pair = |pair: &HeritagePair| {
        !pair.is_empty() && (!full.contains(&pair.name, &pair.file) || kept.contains(&pair.name, &pair.file))
    };
    components
        .into_iter()
        .map(|component| match component {
            Component::Class(mut class) => {
                class.extends.retain(|p| keep_pair(p));
                class.implements.retain(|p| keep_pair(p));
                Component::Class(class)
            }
            Component::Interface(mut interface) => {
                interface.extends.retain(|p| keep_pair(p));
                Component::Interface(interface)
            }
            Component::Namespace(mut namespace) => {
                namespace.parts = prune_heritage(namespace.parts, full, kept);
                Component::Namespace(namespace)
            }
            other => other,
        })
        .collect()
}
