//! Build extension points.
//!
//! Hooks are registered per named point and run in registration order.
//! A failing hook is reported as a warning; it never fails the build.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::core::ArtifactPath;

/// Named points in a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Before Discover
    BeforeBuild,
    /// After Produce (and Prune), with the built artifacts
    AfterBuild,
    /// Before Prune, with the orphans about to be removed
    BeforePrune,
}

impl HookPoint {
    pub const ALL: [HookPoint; 3] = [Self::BeforeBuild, Self::AfterBuild, Self::BeforePrune];

    pub fn name(self) -> &'static str {
        match self {
            Self::BeforeBuild => "before-build",
            Self::AfterBuild => "after-build",
            Self::BeforePrune => "before-prune",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a hook is told about the run.
#[derive(Debug, Clone, Copy)]
pub struct HookEvent<'a> {
    pub point: HookPoint,
    pub project_root: &'a Path,
    pub output_root: &'a Path,
    /// Built artifacts (`after-build`) or orphans (`before-prune`)
    pub artifacts: &'a [ArtifactPath],
}

pub trait BuildHook: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, event: &HookEvent<'_>) -> Result<()>;
}

#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: Vec<(HookPoint, Arc<dyn BuildHook>)>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, point: HookPoint, hook: Arc<dyn BuildHook>) {
        self.hooks.push((point, hook));
    }

    /// Register by point name (`before-build`, ...).
    pub fn register_named(&mut self, point: &str, hook: Arc<dyn BuildHook>) -> Result<()> {
        let Some(point) = HookPoint::from_name(point) else {
            anyhow::bail!("unknown hook point `{point}`");
        };
        self.register(point, hook);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook registered for `event.point`; failures become warnings.
    pub fn emit(&self, event: &HookEvent<'_>) -> Vec<String> {
        let mut warnings = Vec::new();
        for (_, hook) in self.hooks.iter().filter(|(p, _)| *p == event.point) {
            crate::debug!("hook"; "{} `{}`", event.point, hook.name());
            if let Err(err) = hook.run(event) {
                warnings.push(format!("{} hook `{}` failed: {err:#}", event.point, hook.name()));
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        seen: Mutex<Vec<(HookPoint, usize)>>,
        fail: bool,
    }

    impl BuildHook for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn run(&self, event: &HookEvent<'_>) -> Result<()> {
            self.seen.lock().push((event.point, event.artifacts.len()));
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn event(point: HookPoint, artifacts: &[ArtifactPath]) -> HookEvent<'_> {
        HookEvent {
            point,
            project_root: Path::new("/site"),
            output_root: Path::new("/site/build"),
            artifacts,
        }
    }

    #[test]
    fn emits_only_to_matching_point() {
        let hook = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let mut registry = HookRegistry::new();
        registry.register_named("after-build", hook.clone()).unwrap();

        let built = [ArtifactPath::new("index.html")];
        assert!(registry.emit(&event(HookPoint::BeforeBuild, &[])).is_empty());
        assert!(registry.emit(&event(HookPoint::AfterBuild, &built)).is_empty());
        assert_eq!(*hook.seen.lock(), [(HookPoint::AfterBuild, 1)]);
    }

    #[test]
    fn failures_become_warnings() {
        let mut registry = HookRegistry::new();
        registry.register(
            HookPoint::BeforePrune,
            Arc::new(Recorder {
                seen: Mutex::new(Vec::new()),
                fail: true,
            }),
        );
        let warnings = registry.emit(&event(HookPoint::BeforePrune, &[]));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("before-prune hook `recorder` failed: boom"));
        assert!(registry.register_named("after-lunch", Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail: false,
        })).is_err());
    }
}
