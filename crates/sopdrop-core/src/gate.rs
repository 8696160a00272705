//! Security gate: every downloaded payload passes here before the host
//! adapter sees it. This is a review step, not a sandbox — nothing stops
//! the code once the user says yes.

use crate::install::InstalledAsset;
use crate::log;
use crate::package::AssetKind;
use crate::registry::Asset;

/// Download counts below this are flagged as barely-reviewed assets.
const LOW_DOWNLOAD_THRESHOLD: u64 = 10;

#[derive(Clone, Debug)]
pub struct GateReport {
    pub asset_ref: String,
    pub publisher: String,
    pub publisher_verified: bool,
    pub download_count: u64,
    pub context: String,
    pub node_count: u64,
    pub warnings: Vec<String>,
    /// HDAs get the stronger warning: they run callback code on install.
    pub elevated: bool,
    /// The current user's own asset; prompting for it is just noise.
    pub own_asset: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Cancelled,
}

/// Build the report shown to the user. `info` and `current_user` are best
/// effort: an unreachable info endpoint downgrades to "unknown" rather than
/// blocking the review.
pub fn assess(
    installed: &InstalledAsset,
    info: Option<&Asset>,
    current_user: Option<&str>,
) -> GateReport {
    let (publisher, publisher_verified, download_count) = match info {
        Some(asset) => (
            asset.owner.username.clone(),
            asset.owner.email_verified,
            asset.download_count,
        ),
        None => ("unknown".to_string(), false, 0),
    };
    let own_asset = current_user.is_some_and(|u| !publisher.is_empty() && u == publisher);

    let (context, node_count, mut warnings) = match &installed.package {
        Some(pkg) => (
            pkg.context.to_uppercase(),
            pkg.metadata.node_count,
            pkg.risk_lines(),
        ),
        None => ("unknown".to_string(), 0, Vec::new()),
    };
    if download_count < LOW_DOWNLOAD_THRESHOLD {
        warnings.push(format!("Low download count ({})", download_count));
    }
    if !publisher_verified {
        warnings.push("Publisher email not verified".to_string());
    }

    GateReport {
        asset_ref: format!("{}@{}", installed.slug, installed.version),
        publisher,
        publisher_verified,
        download_count,
        context,
        node_count,
        warnings,
        elevated: installed.kind == AssetKind::Hda,
        own_asset,
    }
}

impl GateReport {
    /// The banner text. Logged verbatim even when the prompt is bypassed.
    pub fn warning_text(&self) -> String {
        let mut lines = Vec::new();
        if self.elevated {
            lines.push("HDA SECURITY WARNING".to_string());
            lines.push(format!("Asset: {}", self.asset_ref));
            lines.push(
                "HDAs can execute arbitrary code via callbacks, shelf tools, and expressions."
                    .to_string(),
            );
            lines.push("Only install HDAs from publishers you trust.".to_string());
        } else {
            lines.push("SECURITY CHECK - review before pasting".to_string());
            lines.push(format!("Asset:      {}", self.asset_ref));
            let badge = if self.publisher_verified {
                " (verified)"
            } else {
                ""
            };
            lines.push(format!("Publisher:  @{}{}", self.publisher, badge));
            lines.push(format!("Downloads:  {}", self.download_count));
            lines.push(format!("Context:    {}", self.context));
            lines.push(format!("Nodes:      {}", self.node_count));
            lines.push("This will execute code in your Houdini session.".to_string());
        }
        for warning in &self.warnings {
            lines.push(format!("Warning: {}", warning));
        }
        lines.join("\n")
    }
}

/// Decide whether the payload may reach the host. `trust` skips the
/// interactive prompt but the warning still lands in the log file.
pub fn review<F>(report: &GateReport, trust: bool, mut confirm: F) -> GateDecision
where
    F: FnMut(&GateReport) -> bool,
{
    if report.own_asset {
        return GateDecision::Proceed;
    }
    log::log_to_file(&report.warning_text());
    if trust {
        return GateDecision::Proceed;
    }
    if confirm(report) {
        GateDecision::Proceed
    } else {
        GateDecision::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_ref::AssetSlug;
    use crate::package::Package;
    use crate::registry::Owner;
    use semver::Version;
    use std::path::PathBuf;

    fn installed(kind: AssetKind, package: Option<Package>) -> InstalledAsset {
        InstalledAsset {
            slug: AssetSlug::parse("ana/melt").unwrap(),
            version: Version::new(1, 0, 0),
            kind,
            path: PathBuf::from("/tmp/ana_melt@1.0.0.sopdrop"),
            package,
            from_cache: false,
        }
    }

    fn info(username: &str, verified: bool, downloads: u64) -> Asset {
        Asset {
            slug: "melt".to_string(),
            owner: Owner {
                username: username.to_string(),
                email_verified: verified,
            },
            download_count: downloads,
            ..Asset::default()
        }
    }

    #[test]
    fn test_popular_verified_asset_has_no_warnings() {
        let pkg = Package {
            context: "sop".to_string(),
            ..Package::default()
        };
        let report = assess(
            &installed(AssetKind::Node, Some(pkg)),
            Some(&info("ana", true, 5000)),
            None,
        );
        assert!(report.warnings.is_empty());
        assert!(!report.elevated);
    }

    #[test]
    fn test_unknown_publisher_collects_warnings() {
        let mut pkg = Package::default();
        pkg.metadata.has_python_sops = true;
        let report = assess(
            &installed(AssetKind::Node, Some(pkg)),
            Some(&info("drifter", false, 3)),
            None,
        );
        assert_eq!(report.warnings.len(), 3);
        assert!(report.warning_text().contains("Low download count (3)"));
    }

    #[test]
    fn test_missing_info_downgrades_to_unknown() {
        let report = assess(&installed(AssetKind::Node, None), None, None);
        assert_eq!(report.publisher, "unknown");
        assert!(!report.own_asset);
    }

    #[test]
    fn test_hda_is_elevated() {
        let report = assess(
            &installed(AssetKind::Hda, None),
            Some(&info("ana", true, 5000)),
            None,
        );
        assert!(report.elevated);
        assert!(report.warning_text().contains("HDA SECURITY WARNING"));
    }

    #[test]
    fn test_own_asset_skips_prompt() {
        let report = assess(
            &installed(AssetKind::Node, None),
            Some(&info("ana", true, 0)),
            Some("ana"),
        );
        assert!(report.own_asset);
        let decision = review(&report, false, |_| panic!("prompt must not run"));
        assert_eq!(decision, GateDecision::Proceed);
    }

    #[test]
    fn test_trust_bypasses_prompt() {
        let report = assess(
            &installed(AssetKind::Hda, None),
            Some(&info("drifter", false, 0)),
            None,
        );
        let decision = review(&report, true, |_| panic!("prompt must not run"));
        assert_eq!(decision, GateDecision::Proceed);
    }

    #[test]
    fn test_declined_prompt_cancels() {
        let report = assess(&installed(AssetKind::Node, None), None, None);
        assert_eq!(review(&report, false, |_| false), GateDecision::Cancelled);
        assert_eq!(review(&report, false, |_| true), GateDecision::Proceed);
    }
}
