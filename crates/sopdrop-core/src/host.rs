//! Seam to the host application. Concrete adapters live with the host
//! integration; this crate only defines what it hands over.

use std::path::Path;

use crate::error::Result;
use crate::package::Package;

/// Consumes decoded payloads on the host side. Implementations insert into
/// the live scene graph; nothing here runs without a gate decision first.
pub trait HostAdapter {
    /// Install an HDA file into the host's asset library.
    fn install_hda(&mut self, path: &Path) -> Result<()>;

    /// Paste a node package at the current cursor. Returns how many items
    /// were created.
    fn paste_nodes(&mut self, package: &Package) -> Result<usize>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::path::PathBuf;

    /// Records what reached the host, for asserting gate ordering.
    #[derive(Default)]
    pub struct RecordingHost {
        pub installed_hdas: Vec<PathBuf>,
        pub pasted_packages: Vec<Package>,
    }

    impl HostAdapter for RecordingHost {
        fn install_hda(&mut self, path: &Path) -> Result<()> {
            self.installed_hdas.push(path.to_path_buf());
            Ok(())
        }

        fn paste_nodes(&mut self, package: &Package) -> Result<usize> {
            self.pasted_packages.push(package.clone());
            Ok(package.metadata.node_count.max(1) as usize)
        }
    }
}
