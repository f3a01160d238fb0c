use crate::client::ClusterClient;
use crate::error::{ClusterError, ClusterResult};
use ctfd_manager_types::MappingTable;
use std::collections::BTreeMap;

/// Backing object for the category/difficulty translation table.
pub const MAPPING_OBJECT: &str = "mapping-map";

/// Loads the mapping table. A missing object or key yields empty sections.
pub async fn load_mapping_table(
    cluster: &dyn ClusterClient,
    namespace: &str,
) -> ClusterResult<MappingTable> {
    let Some(object) = cluster.get(namespace, MAPPING_OBJECT).await? else {
        return Ok(MappingTable::default());
    };

    let section = |key: &str| -> ClusterResult<BTreeMap<String, String>> {
        match object.entry(key) {
            None | Some("") => Ok(BTreeMap::new()),
            Some(raw) => serde_json::from_str(raw).map_err(|e| ClusterError::Decode {
                object: MAPPING_OBJECT.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    };

    Ok(MappingTable {
        categories: section("categories")?,
        difficulties: section("difficulties")?,
        difficulty_categories: section("difficulty-categories")?,
    })
}
