//! JSON fixtures for the in-memory table.
//!
//! ```json
//! {"groups": [{"id": 3, "name": "alpha", "fields": {"salary": 100}}]}
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use rowfs_store::InMemoryDataStore;
use rowfs_types::RowId;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    #[serde(default)]
    pub groups: Vec<FixtureGroup>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureGroup {
    pub id: RowId,
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing fixture {}", path.display()))
    }

    /// Insert every group into `store`.
    pub fn seed(self, store: &InMemoryDataStore) -> anyhow::Result<()> {
        let count = self.groups.len();
        for group in self.groups {
            let name = group.name.clone();
            store
                .insert_row(group.id, group.name, group.fields)
                .with_context(|| format!("seeding group {name:?}"))?;
        }
        info!(groups = count, "fixture loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowfs_store::DataStore;
    use rowfs_types::FieldCatalog;
    use std::sync::Arc;

    fn store() -> InMemoryDataStore {
        InMemoryDataStore::new(Arc::new(
            FieldCatalog::with_default_base(["salary", "notes"]).unwrap(),
        ))
    }

    #[test]
    fn seed_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"{"groups": [
                {"id": 3, "name": "alpha", "fields": {"salary": 100}},
                {"id": 4, "name": "beta"}
            ]}"#,
        )
        .unwrap();

        let s = store();
        Fixture::load(&path).unwrap().seed(&s).unwrap();

        let groups = s.list_groups().unwrap();
        assert_eq!(groups.len(), 2);
        let salary = s.catalog().lookup("salary").unwrap();
        assert_eq!(s.get_field("alpha", salary).unwrap(), Some(b"100".to_vec()));
    }

    #[test]
    fn unknown_column_fails_seeding() {
        let fixture: Fixture =
            serde_json::from_str(r#"{"groups": [{"id": 1, "name": "a", "fields": {"pw": 1}}]}"#)
                .unwrap();
        assert!(fixture.seed(&store()).is_err());
    }

    #[test]
    fn zero_row_id_rejected() {
        let parsed = serde_json::from_str::<Fixture>(r#"{"groups": [{"id": 0, "name": "a"}]}"#);
        assert!(parsed.is_err());
    }
}
