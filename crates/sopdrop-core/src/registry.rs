//! Registry client: search, info, versions, download, publish, whoami.
//! Wire shapes follow the server's camelCase JSON contract.

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::asset_ref::{AssetRef, AssetSlug, VersionSpec};
use crate::config;
use crate::error::{Result, SopdropError};
use crate::http_client;
use crate::package::{AssetKind, Package};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Owner {
    pub username: String,
    pub email_verified: bool,
}

/// One row of a search result.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetSummary {
    pub slug: String,
    pub owner: Owner,
    pub description: String,
    pub houdini_context: String,
    pub download_count: u64,
    pub tags: Vec<String>,
}

/// Full asset record from `GET assets/{slug}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Asset {
    pub slug: String,
    pub owner: Owner,
    pub description: String,
    pub houdini_context: String,
    pub license: String,
    pub latest_version: Option<String>,
    pub download_count: u64,
    pub tags: Vec<String>,
    pub asset_type: Option<String>,
}

/// A published version. Immutable once it exists.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetVersion {
    pub version: String,
    pub published_at: Option<String>,
    pub download_count: u64,
    /// SHA-256 hex over the version's payload.
    pub checksum: Option<String>,
    pub size_bytes: Option<u64>,
    pub changelog: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub username: String,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    assets: Vec<AssetSummary>,
}

/// Fields the caller supplies when publishing.
#[derive(Clone, Debug, Serialize)]
pub struct PublishManifest {
    pub name: String,
    pub description: String,
    pub license: String,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublishedAsset {
    pub slug: String,
    pub version: String,
    pub node_count: u64,
    pub context: String,
}

/// A downloaded payload, still in memory; the cache decides where it lands.
#[derive(Clone, Debug)]
pub enum AssetPayload {
    Node(Package),
    Hda(Vec<u8>),
}

impl AssetPayload {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetPayload::Node(_) => AssetKind::Node,
            AssetPayload::Hda(_) => AssetKind::Hda,
        }
    }
}

/// Pick the highest semantic version out of a registry version list,
/// carrying its checksum. Unparseable version strings are skipped.
pub fn pick_latest(versions: &[AssetVersion]) -> Option<(Version, Option<String>)> {
    let mut best: Option<(Version, Option<String>)> = None;
    for record in versions {
        if let Ok(v) = Version::parse(&record.version) {
            if best.as_ref().map_or(true, |(b, _)| v > *b) {
                best = Some((v, record.checksum.clone()));
            }
        }
    }
    best
}

/// Client for one registry server. The token is read from disk per call so
/// login/logout in another process takes effect immediately.
pub struct RegistryClient {
    api_url: String,
}

impl RegistryClient {
    /// Client for the configured server (env override applies).
    pub fn new() -> Self {
        let config = config::load();
        Self {
            api_url: config::api_url(&config),
        }
    }

    /// Client for an explicit API base, e.g. `http://127.0.0.1:8080/api/v1`.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// Fail with Auth before touching the network when no token is stored.
    fn require_token(&self) -> Result<String> {
        config::token().ok_or_else(|| {
            SopdropError::Auth("no stored token; run `sopdrop login`".to_string())
        })
    }

    // === Search & browse (no auth required) ===

    pub fn search(
        &self,
        query: &str,
        context: Option<&str>,
        tags: &[String],
    ) -> Result<Vec<AssetSummary>> {
        let joined = tags.join(",");
        let mut params: Vec<(&str, &str)> = vec![("q", query)];
        if let Some(ctx) = context {
            params.push(("context", ctx));
        }
        if !joined.is_empty() {
            params.push(("tags", joined.as_str()));
        }
        let resp = http_client::get(&self.endpoint("assets"), &params, None)?;
        let parsed: SearchResponse = serde_json::from_slice(&resp.body)?;
        Ok(parsed.assets)
    }

    pub fn info(&self, slug: &AssetSlug) -> Result<Asset> {
        let resp = http_client::get(&self.endpoint(&format!("assets/{}", slug)), &[], None)?;
        Ok(serde_json::from_slice(&resp.body)?)
    }

    pub fn versions(&self, slug: &AssetSlug) -> Result<Vec<AssetVersion>> {
        let resp = http_client::get(
            &self.endpoint(&format!("assets/{}/versions", slug)),
            &[],
            None,
        )?;
        Ok(serde_json::from_slice(&resp.body)?)
    }

    /// Resolve a reference to a concrete version plus, when the registry
    /// reports one, the checksum the cached payload must match.
    ///
    /// An exact pin skips the version listing (existence is checked by the
    /// download itself); `latest` takes the highest semantic version the
    /// registry reports right now, falling back to the info record when the
    /// listing is empty.
    pub fn resolve_version(&self, aref: &AssetRef) -> Result<(Version, Option<String>)> {
        match &aref.version {
            VersionSpec::Exact(v) => Ok((v.clone(), None)),
            VersionSpec::Latest => {
                let versions = self.versions(&aref.slug)?;
                if let Some(found) = pick_latest(&versions) {
                    return Ok(found);
                }
                let asset = self.info(&aref.slug)?;
                if let Some(latest) = asset.latest_version.as_deref() {
                    if let Ok(v) = Version::parse(latest) {
                        return Ok((v, None));
                    }
                }
                Err(SopdropError::NotFound(format!(
                    "asset '{}' has no published versions",
                    aref.slug
                )))
            }
        }
    }

    // === Download ===

    /// Fetch one version's payload. A JSON response is a node package
    /// (unwrapped from its `package` envelope when present); anything else
    /// is raw HDA bytes. The token is attached when present so private
    /// assets resolve, but none is required.
    pub fn download(&self, slug: &AssetSlug, version: &Version) -> Result<AssetPayload> {
        let token = config::token();
        let url = self.endpoint(&format!("assets/{}/download/{}", slug, version));
        let resp = http_client::get(&url, &[], token.as_deref())?;
        if resp.is_json() {
            let value: serde_json::Value = serde_json::from_slice(&resp.body)?;
            let package_value = match value.get("package") {
                Some(inner) => inner.clone(),
                None => value,
            };
            let package: Package = serde_json::from_value(package_value)?;
            Ok(AssetPayload::Node(package))
        } else {
            Ok(AssetPayload::Hda(resp.body))
        }
    }

    // === Publish (auth required) ===

    pub fn publish(&self, manifest: &PublishManifest, package: &Package) -> Result<PublishedAsset> {
        let token = self.require_token()?;
        let body = serde_json::json!({
            "name": manifest.name,
            "description": manifest.description,
            "license": manifest.license,
            "tags": manifest.tags,
            "package": package,
        });
        let resp = http_client::post_json(&self.endpoint("assets"), &body, Some(&token))?;
        Ok(serde_json::from_slice(&resp.body)?)
    }

    pub fn publish_hda(
        &self,
        manifest: &PublishManifest,
        context: &str,
        filename: &str,
        hda_bytes: &[u8],
    ) -> Result<PublishedAsset> {
        let token = self.require_token()?;
        let tags_json = serde_json::to_string(&manifest.tags)?;
        let fields: Vec<(&str, String)> = vec![
            ("name", manifest.name.clone()),
            ("description", manifest.description.clone()),
            ("license", manifest.license.clone()),
            ("houdiniContext", context.to_string()),
            ("tags", tags_json),
        ];
        let resp = http_client::post_multipart(
            &self.endpoint("assets/hda"),
            &fields,
            "file",
            filename,
            hda_bytes,
            &token,
        )?;
        Ok(serde_json::from_slice(&resp.body)?)
    }

    // === Auth ===

    pub fn whoami(&self) -> Result<User> {
        let token = self.require_token()?;
        let resp = http_client::get(&self.endpoint("auth/me"), &[], Some(&token))?;
        Ok(serde_json::from_slice(&resp.body)?)
    }

    /// Store `token`, then verify it against the server. A rejected token is
    /// removed again so a bad paste does not wedge later calls.
    pub fn verify_login(&self, token: &str) -> Result<User> {
        config::save_token(token)?;
        match self.whoami() {
            Ok(user) => Ok(user),
            Err(e) => {
                if matches!(&e, SopdropError::Auth(_)) {
                    config::clear_token()?;
                }
                Err(e)
            }
        }
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}
