//! The install/uninstall/status workflow over one binfmt_misc backend.

use crate::config::EmulatorEnv;
use crate::discovery::{expand_install_targets, expand_uninstall_targets};
use crate::error::Result;
use crate::kernel::BinfmtInterface;
use crate::locator::BinaryLocator;
use crate::platform::PlatformProbe;
use crate::registrar::Registrar;
use crate::report::{Action, BatchReport};
use crate::status::StatusSnapshot;

/// Applies install and uninstall selectors and reports status.
///
/// Every target is processed on its own: a failure is recorded in the
/// returned [`BatchReport`] and the next target is still attempted.
pub struct BinfmtManager<B, P> {
    kernel: B,
    probe: P,
    locator: BinaryLocator,
}

impl<B, P> BinfmtManager<B, P>
where
    B: BinfmtInterface,
    P: PlatformProbe,
{
    pub fn new(kernel: B, probe: P, env: EmulatorEnv) -> Self {
        Self {
            kernel,
            probe,
            locator: BinaryLocator::new(env),
        }
    }

    pub fn kernel(&self) -> &B {
        &self.kernel
    }

    pub fn locator(&self) -> &BinaryLocator {
        &self.locator
    }

    pub fn registrar(&self) -> Registrar<'_, B> {
        Registrar::new(&self.kernel, &self.locator)
    }

    /// Deregister every target named by a comma-separated selector.
    pub fn uninstall_targets(&self, selector: &str) -> BatchReport {
        let registrar = self.registrar();
        let mut report = BatchReport::default();
        for target in expand_uninstall_targets(selector, &self.kernel) {
            let result = registrar.uninstall(&target).map(|_| ());
            report.push(Action::Uninstall, target, result);
        }
        report
    }

    /// Register every architecture named by a selector (`all` included).
    pub fn install_targets(&self, selector: &str) -> BatchReport {
        let registrar = self.registrar();
        let mut report = BatchReport::default();
        for arch in expand_install_targets(selector, &self.kernel, &self.probe, &self.locator) {
            let result = registrar.install(&arch).map(|_| ());
            report.push(Action::Install, arch, result);
        }
        report
    }

    /// Current supported platforms and enabled emulators.
    pub fn status(&self) -> Result<StatusSnapshot> {
        StatusSnapshot::collect(&self.kernel, &self.probe)
    }
}
