//! Install, paste, and review orchestration on top of the registry client
//! and the cache.

use std::path::PathBuf;

use semver::Version;

use crate::asset_ref::{AssetRef, AssetSlug};
use crate::cache::AssetCache;
use crate::config;
use crate::error::{Result, SopdropError};
use crate::gate::{self, GateDecision, GateReport};
use crate::host::HostAdapter;
use crate::log;
use crate::package::{AssetKind, Package};
use crate::registry::{AssetPayload, RegistryClient};

/// A payload resolved to a concrete version and present on disk.
#[derive(Clone, Debug)]
pub struct InstalledAsset {
    pub slug: AssetSlug,
    pub version: Version,
    pub kind: AssetKind,
    pub path: PathBuf,
    /// Present for node packages, absent for HDAs.
    pub package: Option<Package>,
    pub from_cache: bool,
}

impl InstalledAsset {
    pub fn ref_string(&self) -> String {
        format!("{}@{}", self.slug, self.version)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PasteOptions {
    /// Re-download even when a valid cache entry exists.
    pub force: bool,
    /// Skip the interactive prompt (the warning is still logged).
    pub trust: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PasteOutcome {
    Pasted { items: usize },
    HdaInstalled { path: PathBuf },
    Cancelled,
}

/// Resolve `aref`, then return the cached payload or download and persist
/// it. Exactly one network fetch happens for a cold version.
pub fn install(
    client: &RegistryClient,
    cache: &AssetCache,
    aref: &AssetRef,
    force: bool,
) -> Result<InstalledAsset> {
    let (version, checksum) = client.resolve_version(aref)?;
    let cached = cache.get_or_fetch(&aref.slug, &version, checksum.as_deref(), force, || {
        client.download(&aref.slug, &version)
    })?;
    let package = match &cached.payload {
        AssetPayload::Node(pkg) => Some(pkg.clone()),
        AssetPayload::Hda(_) => None,
    };
    let installed = InstalledAsset {
        slug: aref.slug.clone(),
        version,
        kind: cached.kind,
        path: cached.path,
        package,
        from_cache: cached.from_cache,
    };
    if cached.from_cache {
        log::log_to_file(&format!("{} served from cache", installed.ref_string()));
    } else {
        log::log_to_file(&format!("Downloaded {}", installed.ref_string()));
    }
    Ok(installed)
}

/// Hand an installed payload to the host. Callers must have passed the gate.
pub fn deliver<H: HostAdapter>(host: &mut H, installed: &InstalledAsset) -> Result<PasteOutcome> {
    match installed.kind {
        AssetKind::Hda => {
            host.install_hda(&installed.path)?;
            Ok(PasteOutcome::HdaInstalled {
                path: installed.path.clone(),
            })
        }
        AssetKind::Node => {
            let package = installed.package.as_ref().ok_or_else(|| {
                SopdropError::Cache("node entry without a package payload".to_string())
            })?;
            let items = host.paste_nodes(package)?;
            Ok(PasteOutcome::Pasted { items })
        }
    }
}

/// Install an asset and paste it into the host, gated by a security review.
/// `confirm` is only consulted when the gate needs a decision.
pub fn paste<H, F>(
    client: &RegistryClient,
    cache: &AssetCache,
    host: &mut H,
    aref: &AssetRef,
    opts: PasteOptions,
    confirm: F,
) -> Result<PasteOutcome>
where
    H: HostAdapter,
    F: FnMut(&GateReport) -> bool,
{
    let installed = install(client, cache, aref, opts.force)?;
    // Best effort: the gate still runs with "unknown" publisher data when
    // the info endpoint is unreachable.
    let info = client.info(&aref.slug).ok();
    let me = client.whoami().ok().map(|u| u.username);
    let report = gate::assess(&installed, info.as_ref(), me.as_deref());
    match gate::review(&report, opts.trust, confirm) {
        GateDecision::Cancelled => {
            log::log_to_file(&format!("Paste of {} cancelled", installed.ref_string()));
            Ok(PasteOutcome::Cancelled)
        }
        GateDecision::Proceed => deliver(host, &installed),
    }
}

/// Install a node asset and stage it on the local clipboard so host-side
/// tooling can paste it without a network round trip.
pub fn copy(client: &RegistryClient, cache: &AssetCache, aref: &AssetRef) -> Result<InstalledAsset> {
    let installed = install(client, cache, aref, false)?;
    match &installed.package {
        Some(pkg) => {
            config::set_clipboard(&installed.ref_string(), pkg)?;
            Ok(installed)
        }
        None => Err(SopdropError::Unsupported(
            "HDAs are installed directly and cannot be copied to the clipboard".to_string(),
        )),
    }
}

// === Review renderers ===

const PREVIEW_NODE_LIMIT: usize = 20;

/// What would be pasted, without executing anything.
pub fn preview_report(installed: &InstalledAsset) -> String {
    let mut lines = Vec::new();
    match &installed.package {
        None => {
            lines.push("HDA PREVIEW".to_string());
            lines.push(format!("Asset: {}", installed.ref_string()));
            lines.push(format!("Path:  {}", installed.path.display()));
            lines.push(String::new());
            lines.push("This is a Houdini Digital Asset.".to_string());
            lines.push(
                "Inspect it with the host's Type Properties before installing.".to_string(),
            );
        }
        Some(pkg) => {
            lines.push("ASSET PREVIEW".to_string());
            lines.push(format!("Asset:    {}", installed.ref_string()));
            lines.push(format!("Format:   {}", pkg.format));
            lines.push(format!("Context:  {}", pkg.context.to_uppercase()));
            lines.push(format!("Houdini:  {}", pkg.houdini_version));
            lines.push(String::new());
            lines.push(format!("Nodes ({}):", pkg.metadata.node_count));
            for (i, name) in pkg.metadata.node_names.iter().take(PREVIEW_NODE_LIMIT).enumerate() {
                let node_type = pkg
                    .metadata
                    .node_types
                    .get(i)
                    .map(String::as_str)
                    .unwrap_or("?");
                lines.push(format!("  - {} ({})", name, node_type));
            }
            if pkg.metadata.node_names.len() > PREVIEW_NODE_LIMIT {
                lines.push(format!(
                    "  ... and {} more",
                    pkg.metadata.node_names.len() - PREVIEW_NODE_LIMIT
                ));
            }
            if pkg.metadata.network_boxes > 0 {
                lines.push(format!("Network boxes: {}", pkg.metadata.network_boxes));
            }
            if pkg.metadata.sticky_notes > 0 {
                lines.push(format!("Sticky notes: {}", pkg.metadata.sticky_notes));
            }
            lines.push(String::new());
            lines.push("Risk assessment:".to_string());
            let risks = pkg.risk_lines();
            if risks.is_empty() {
                lines.push("  No obvious risks detected".to_string());
            } else {
                for risk in risks {
                    lines.push(format!("  ! {}", risk));
                }
            }
            if let Some(checksum) = &pkg.checksum {
                lines.push(String::new());
                lines.push(format!("Checksum: {}...", &checksum[..checksum.len().min(32)]));
                lines.push("          (SHA-256 verified on download)".to_string());
            }
        }
    }
    lines.join("\n")
}

/// The reviewable code for a v1 package; a structural summary otherwise.
pub fn code_listing(installed: &InstalledAsset) -> String {
    let Some(pkg) = &installed.package else {
        return "This is an HDA asset. Inspect it with the host's Type Properties.".to_string();
    };
    if pkg.is_v1() {
        match &pkg.code {
            Some(code) if !code.is_empty() => code.clone(),
            _ => "No code in package".to_string(),
        }
    } else {
        let mut lines = vec![
            format!("Format: {}", pkg.format),
            "This package uses binary format - no viewable code.".to_string(),
            format!("Nodes: {}", pkg.metadata.node_count),
            format!("Types: {}", pkg.metadata.node_types.join(", ")),
            format!("Names: {}", pkg.metadata.node_names.join(", ")),
        ];
        if let Some(checksum) = &pkg.checksum {
            lines.push(format!("Checksum: {}...", &checksum[..checksum.len().min(16)]));
        }
        lines.join("\n")
    }
}

/// Structural summary of an installed asset (the `show_info` surface).
pub fn package_report(installed: &InstalledAsset) -> String {
    let Some(pkg) = &installed.package else {
        return format!(
            "This is an HDA asset.\nPath: {}",
            installed.path.display()
        );
    };
    let mut lines = vec![
        "=== Package Info ===".to_string(),
        format!("Format: {}", pkg.format),
        format!("Context: {}", pkg.context),
        format!("Houdini version: {}", pkg.houdini_version),
        format!("Nodes: {}", pkg.metadata.node_count),
    ];
    for name in pkg.metadata.node_names.iter().take(10) {
        lines.push(format!("  - {}", name));
    }
    if pkg.metadata.node_names.len() > 10 {
        lines.push(format!("  ... and {} more", pkg.metadata.node_names.len() - 10));
    }
    lines.push(format!("Node types: {}", pkg.metadata.node_types.join(", ")));
    if !pkg.dependencies.is_empty() {
        lines.push("Dependencies:".to_string());
        for dep in &pkg.dependencies {
            lines.push(format!("  - {}", dep.name));
        }
    }
    if pkg.checksum.is_some() {
        lines.push("Integrity: SHA-256 verified".to_string());
    }
    lines.join("\n")
}
