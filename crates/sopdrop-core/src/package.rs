//! Decoded `.sopdrop` node-package payloads and their embedded metadata.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// What kind of payload an asset resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    /// A `.sopdrop` JSON node package.
    Node,
    /// A Houdini Digital Asset binary. Can execute callback code in the host.
    Hda,
}

impl AssetKind {
    pub fn extension(&self) -> &'static str {
        match self {
            AssetKind::Node => ".sopdrop",
            AssetKind::Hda => ".hda",
        }
    }
}

/// Counts and risk flags the exporter embeds in every package.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageMetadata {
    pub node_count: u64,
    pub top_level_count: u64,
    /// De-duplicated type names of the exported nodes.
    pub node_types: Vec<String>,
    pub node_names: Vec<String>,
    pub network_boxes: u64,
    pub sticky_notes: u64,
    pub network_dots: u64,
    pub has_hda_dependencies: bool,
    pub has_python_sops: bool,
    pub has_expressions: bool,
}

/// A custom HDA the package depends on but does not carry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HdaDependency {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// A node package as published to and downloaded from the registry.
///
/// v1 packages carry reviewable `code`; v2 packages carry opaque binary data
/// in `extra` with a checksum over it. Fields the client does not interpret
/// (geometry, node graph, binary data) round-trip through `extra` untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    /// Format tag, e.g. "sopdrop-v1" or "sopdrop-v2".
    pub format: String,
    /// Host context the nodes belong to ("sop", "vop", ...).
    pub context: String,
    pub houdini_version: String,
    pub metadata: PackageMetadata,
    pub dependencies: Vec<HdaDependency>,
    /// v1 only: the generated build script, reviewable before pasting.
    pub code: Option<String>,
    /// SHA-256 hex over the payload (v1: the code text; v2: the binary data).
    pub checksum: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Package {
    pub fn is_v1(&self) -> bool {
        self.format.starts_with("sopdrop-v1")
    }

    /// Verify the embedded checksum against the code text where both exist.
    /// v2 binary payloads are verified by the cache layer against the
    /// registry-reported checksum instead.
    pub fn verify_integrity(&self) -> bool {
        match (&self.checksum, &self.code) {
            (Some(expected), Some(code)) => sha256_hex(code.as_bytes()) == *expected,
            _ => true,
        }
    }

    /// Human-readable risk lines for the security gate.
    pub fn risk_lines(&self) -> Vec<String> {
        let mut risks = Vec::new();
        if self.metadata.has_python_sops {
            risks.push("Contains Python nodes (executes code)".to_string());
        }
        if self.metadata.has_hda_dependencies || !self.dependencies.is_empty() {
            risks.push("Requires external HDAs".to_string());
        }
        if self.metadata.has_expressions {
            risks.push("Uses channel expressions".to_string());
        }
        risks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1_package(code: &str) -> Package {
        Package {
            format: "sopdrop-v1".to_string(),
            context: "sop".to_string(),
            houdini_version: "20.5.278".to_string(),
            code: Some(code.to_string()),
            checksum: Some(sha256_hex(code.as_bytes())),
            ..Package::default()
        }
    }

    #[test]
    fn test_parses_exported_shape() {
        let json = r#"{
            "format": "sopdrop-v1",
            "context": "sop",
            "houdini_version": "20.5.278",
            "metadata": {
                "node_count": 3,
                "node_types": ["scatter", "grid"],
                "node_names": ["scatter1", "grid1", "null1"],
                "network_boxes": 1,
                "sticky_notes": 0,
                "has_hda_dependencies": true
            },
            "dependencies": [{"name": "studio::tools", "version": "2.0"}],
            "code": "hou_parent.createNode('grid')",
            "checksum": "abc",
            "node_graph": {"grid1": []}
        }"#;
        let pkg: Package = serde_json::from_str(json).unwrap();
        assert_eq!(pkg.metadata.node_count, 3);
        assert_eq!(pkg.dependencies[0].name, "studio::tools");
        assert!(pkg.metadata.has_hda_dependencies);
        // Uninterpreted fields survive a round trip.
        assert!(pkg.extra.contains_key("node_graph"));
        let back = serde_json::to_value(&pkg).unwrap();
        assert_eq!(back["node_graph"]["grid1"], serde_json::json!([]));
    }

    #[test]
    fn test_integrity_matches_code() {
        let pkg = v1_package("hou_parent.createNode('box')");
        assert!(pkg.verify_integrity());

        let mut tampered = pkg.clone();
        tampered.code = Some("import os; os.system('rm -rf /')".to_string());
        assert!(!tampered.verify_integrity());
    }

    #[test]
    fn test_integrity_trivially_true_without_checksum() {
        let mut pkg = v1_package("x");
        pkg.checksum = None;
        assert!(pkg.verify_integrity());
    }

    #[test]
    fn test_risk_lines() {
        let mut pkg = v1_package("x");
        assert!(pkg.risk_lines().is_empty());
        pkg.metadata.has_python_sops = true;
        pkg.dependencies.push(HdaDependency {
            name: "studio::deform".to_string(),
            version: None,
        });
        let risks = pkg.risk_lines();
        assert_eq!(risks.len(), 2);
        assert!(risks[0].contains("Python"));
    }
}
