use std::collections::BTreeSet;

use tracing::debug;

use crate::config::TangleConfig;
use crate::error::InspectError;
use crate::types::NodeKind;

use super::builtin;
use super::traits::{GlobalInspector, Inspector, InspectorContract, ItemInspector};

/// The inspectors of one run, in registration order.
#[derive(Debug, Default)]
pub struct InspectorRegistry {
    inspectors: Vec<Inspector>,
    disabled: BTreeSet<String>,
}

impl InspectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in inspector, minus those the config disables.
    pub fn with_builtins(config: &TangleConfig) -> crate::error::Result<Self> {
        let mut registry = Self::new();
        registry.disabled = config.inspectors.disabled.iter().cloned().collect();
        for inspector in builtin::all(config) {
            registry.register(inspector)?;
        }
        Ok(registry)
    }

    /// Add an inspector. Ids are unique; a disabled id is accepted and
    /// skipped.
    pub fn register(&mut self, inspector: Inspector) -> crate::error::Result<()> {
        let contract = inspector.contract();
        validate(contract, &inspector)?;
        if self.inspectors.iter().any(|i| i.id() == contract.id) {
            return Err(InspectError::DuplicateId(contract.id.clone()).into());
        }
        if self.disabled.contains(&contract.id) {
            debug!(inspector = %contract.id, "Inspector disabled by config");
            return Ok(());
        }
        self.inspectors.push(inspector);
        Ok(())
    }

    /// Disable an id for later registrations.
    pub fn disable(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.inspectors.retain(|i| i.id() != id);
        self.disabled.insert(id);
    }

    pub fn len(&self) -> usize {
        self.inspectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inspectors.is_empty()
    }

    pub fn contracts(&self) -> impl Iterator<Item = &InspectorContract> {
        self.inspectors.iter().map(Inspector::contract)
    }

    pub fn item_inspectors(&self, kind: NodeKind) -> Vec<&dyn ItemInspector> {
        self.inspectors
            .iter()
            .filter_map(|i| match i {
                Inspector::Item(item) if item.contract().target_kind == kind => Some(item.as_ref()),
                _ => None,
            })
            .collect()
    }

    pub fn global_inspectors(&self, kind: NodeKind) -> Vec<&dyn GlobalInspector> {
        self.inspectors
            .iter()
            .filter_map(|i| match i {
                Inspector::Global(global) if global.contract().target_kind == kind => {
                    Some(global.as_ref())
                }
                _ => None,
            })
            .collect()
    }
}

fn validate(contract: &InspectorContract, inspector: &Inspector) -> crate::error::Result<()> {
    let invalid = |message: &str| InspectError::Invalid {
        item: contract.id.clone(),
        message: message.to_string(),
    };
    if contract.id.is_empty() {
        return Err(invalid("inspector id is empty").into());
    }
    if contract.target_kind == NodeKind::Package {
        return Err(invalid("inspectors target files or classes").into());
    }
    let is_global = matches!(inspector, Inspector::Global(_));
    if is_global != contract.requires_all_items_processed {
        return Err(invalid("global inspectors must require all items processed").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TangleError;
    use crate::inspect::{ItemOutput, ItemView, PerItemCache};

    struct Named(InspectorContract);

    impl ItemInspector for Named {
        fn contract(&self) -> &InspectorContract {
            &self.0
        }
        fn run(
            &self,
            _item: &ItemView<'_>,
            _out: &mut ItemOutput,
            _cache: &mut PerItemCache,
        ) -> crate::error::Result<()> {
            Ok(())
        }
    }

    fn named(id: &str, kind: NodeKind) -> Inspector {
        Inspector::item(Named(InspectorContract::new(id, kind)))
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = InspectorRegistry::new();
        registry.register(named("a", NodeKind::File)).unwrap();
        let err = registry.register(named("a", NodeKind::Class)).unwrap_err();
        assert!(matches!(err, TangleError::Inspect(InspectError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn package_targets_and_mismatched_globals_are_rejected() {
        let mut registry = InspectorRegistry::new();
        assert!(registry.register(named("p", NodeKind::Package)).is_err());
        let global_item = Inspector::item(Named(InspectorContract::new("g", NodeKind::Class).global()));
        assert!(registry.register(global_item).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn inspectors_are_split_by_kind() {
        let mut registry = InspectorRegistry::new();
        registry.register(named("f1", NodeKind::File)).unwrap();
        registry.register(named("c1", NodeKind::Class)).unwrap();
        registry.register(named("f2", NodeKind::File)).unwrap();

        let files: Vec<&str> = registry
            .item_inspectors(NodeKind::File)
            .iter()
            .map(|i| i.contract().id.as_str())
            .collect();
        assert_eq!(files, ["f1", "f2"]);
        assert_eq!(registry.item_inspectors(NodeKind::Class).len(), 1);
        assert!(registry.global_inspectors(NodeKind::Class).is_empty());
    }

    #[test]
    fn builtins_respect_disabled_config() {
        let all = InspectorRegistry::with_builtins(&TangleConfig::default()).unwrap();
        let mut config = TangleConfig::default();
        config.inspectors.disabled = vec!["generic-complexity".to_string()];
        let some = InspectorRegistry::with_builtins(&config).unwrap();

        assert_eq!(some.len() + 1, all.len());
        assert!(some.contracts().all(|c| c.id != "generic-complexity"));
    }
}
