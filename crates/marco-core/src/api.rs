//! Wire format of the compatibility query endpoint.

use crate::gav::Gav;
use serde::{Deserialize, Serialize};

/// Route of the query endpoint; the final segment is `group:artifact:version`.
pub const COMPATIBILITIES_ROUTE: &str = "/compatibilities";

/// Body of a `200` answer. An empty `compatible_versions` list is a computed
/// (if unusual) result; a coordinate that was never searched answers `404`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityResponse {
    pub gav: String,
    pub compatible_versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `/compatibilities/{group}:{artifact}:{version}`
pub fn compatibilities_path(gav: &Gav) -> String {
    format!(
        "{COMPATIBILITIES_ROUTE}/{}:{}:{}",
        urlencoding::encode(&gav.group_id),
        urlencoding::encode(&gav.artifact_id),
        urlencoding::encode(&gav.version)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibilities_path_keeps_colons_readable() {
        let gav = Gav::new("com.fasterxml.jackson.core", "jackson-databind", "2.16.0");
        assert_eq!(
            compatibilities_path(&gav),
            "/compatibilities/com.fasterxml.jackson.core:jackson-databind:2.16.0"
        );
    }

    #[test]
    fn test_compatibilities_path_encodes_components() {
        let gav = Gav::new("org.example", "lib", "1.0 beta");
        assert_eq!(compatibilities_path(&gav), "/compatibilities/org.example:lib:1.0%20beta");
    }

    #[test]
    fn test_response_roundtrip_field_names() {
        let json = r#"{"gav": "a:b:1.0", "compatible_versions": ["1.0", "1.1"]}"#;
        let response: CompatibilityResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.compatible_versions, vec!["1.0", "1.1"]);
    }
}
