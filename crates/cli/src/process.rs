// Run-state guard backed by a process-table scan.

use fieldtuner_core::RunStateGuard;
use sysinfo::System;

/// Blocks writes while any process with one of `names` is running.
/// Names compare case-insensitively.
#[derive(Debug, Clone)]
pub struct ProcessGuard {
    names: Vec<String>,
}

impl ProcessGuard {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    fn matches(&self, process_name: &str) -> bool {
        let name = process_name.to_lowercase();
        self.names.iter().any(|n| *n == name)
    }
}

impl RunStateGuard for ProcessGuard {
    fn running_process(&self) -> Option<String> {
        if self.names.is_empty() {
            return None;
        }
        let mut system = System::new();
        system.refresh_processes();
        let found = system
            .processes()
            .values()
            .map(|p| p.name())
            .find(|name| self.matches(name))
            .map(str::to_string);
        if let Some(name) = &found {
            log::debug!("guarded process running: {name}");
        }
        found
    }
}
