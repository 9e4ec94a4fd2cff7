use std::sync::Arc;

use rowfs_types::{Address, FieldCatalog};

use crate::error::{FsError, FsResult};
use crate::namespace::{Namespace, NodeId};

/// Recovers the semantic [`Address`] of a namespace position.
///
/// The namespace carries no row or field identifiers of its own: meaning is
/// positional. Classification walks at most two levels up from `position`
/// and reads names off the way. Field names are checked against the catalog
/// here, so an unknown name never becomes an `Address`.
#[derive(Clone, Debug)]
pub struct AddressResolver {
    catalog: Arc<FieldCatalog>,
}

impl AddressResolver {
    pub fn new(catalog: Arc<FieldCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Classify `position`, or the child `target` beneath it.
    ///
    /// | position depth | no target        | target `t`            |
    /// |----------------|------------------|-----------------------|
    /// | 0 (root)       | `Root`           | `Group{t}`            |
    /// | 1 (group `g`)  | `Group{g}`       | `Data{g, t}`          |
    /// | 2 (field `f`)  | `Data{g, f}`     | `Unsupported`         |
    /// | deeper         | `Unsupported`    | `Unsupported`         |
    ///
    /// An empty target counts as no target. A field name missing from the
    /// catalog is `NotFound`.
    pub fn classify(
        &self,
        ns: &Namespace,
        position: NodeId,
        target: Option<&str>,
    ) -> FsResult<Address> {
        let target = target.filter(|t| !t.is_empty());

        // Names from `position` upward, root excluded.
        let mut chain: Vec<&str> = Vec::with_capacity(2);
        let mut cur = ns.node(position)?;
        while let Some(parent) = cur.parent() {
            if chain.len() == 2 {
                return Err(FsError::Unsupported(format!(
                    "{} is nested deeper than two levels",
                    ns.path(position)
                )));
            }
            chain.push(cur.name());
            cur = ns.node(parent)?;
        }

        match (chain.as_slice(), target) {
            ([], None) => Ok(Address::Root),
            ([], Some(group)) => Ok(Address::group(group)),
            ([group], None) => Ok(Address::group(*group)),
            ([group], Some(field)) => self.data(group, field),
            ([field, group], None) => self.data(group, field),
            ([field, group], Some(child)) => Err(FsError::Unsupported(format!(
                "{group}/{field} is a file and has no child {child:?}"
            ))),
            _ => Err(FsError::Unsupported(ns.path(position))),
        }
    }

    fn data(&self, group: &str, field: &str) -> FsResult<Address> {
        let id = self
            .catalog
            .lookup(field)
            .ok_or_else(|| FsError::NotFound(format!("{group}/{field}")))?;
        Ok(Address::data(group, id))
    }
}
