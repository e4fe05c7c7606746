//! Validated set of components to monitor.

use std::collections::BTreeSet;
use std::str::FromStr;

use joule_platform::ComponentKind;

use crate::error::{MonitorError, Result};

/// Upper bound on entries in a request, one per [`ComponentKind`].
pub const MAX_COMPONENTS: usize = ComponentKind::ALL.len();

/// The components a monitor should build.
///
/// Constructing one is the only validation step: unknown keys, duplicate
/// keys and oversized requests are rejected here, before any hardware is
/// probed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentRequest {
    kinds: BTreeSet<ComponentKind>,
}

impl ComponentRequest {
    /// Builds a request from `name -> enabled` flags such as
    /// `{"cpu": true, "gpu": false}`.
    ///
    /// Disabled entries are validated but not monitored.
    pub fn from_flags<I, K>(flags: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, bool)>,
        K: AsRef<str>,
    {
        let flags: Vec<(K, bool)> = flags.into_iter().collect();
        if flags.len() > MAX_COMPONENTS {
            return Err(MonitorError::InvalidComponentSet(format!(
                "{} entries given, at most {MAX_COMPONENTS} allowed",
                flags.len()
            )));
        }

        let mut seen = BTreeSet::new();
        let mut kinds = BTreeSet::new();
        for (key, enabled) in &flags {
            let key = key.as_ref();
            let kind = ComponentKind::from_key(key).ok_or_else(|| {
                MonitorError::InvalidComponentSet(format!(
                    "unknown component '{key}' (expected cpu, gpu or memory)"
                ))
            })?;
            if !seen.insert(kind) {
                return Err(MonitorError::InvalidComponentSet(format!(
                    "component '{key}' given more than once"
                )));
            }
            if *enabled {
                kinds.insert(kind);
            }
        }

        Ok(Self { kinds })
    }

    /// Request for the given kinds. Cannot fail since the kinds are typed.
    pub fn of(kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Request for every supported component.
    pub fn all() -> Self {
        Self::of(ComponentKind::ALL)
    }

    /// Requested kinds in reporting order.
    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.kinds.iter().copied()
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Parses a comma-separated list such as `"cpu,memory"`.
impl FromStr for ComponentRequest {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        let keys: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect();
        Self::from_flags(keys.into_iter().map(|k| (k, true)))
    }
}
