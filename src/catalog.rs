//! Capability catalog.
//!
//! [`Catalog`] is the read-only description of what the backend accepts:
//! controller buttons and axes (inputs), control actions and plane axes
//! (outputs), per-output whitelists and the numeric limits for axis
//! parameters. It is fetched with every controls load and bounds every
//! mapping the validator lets through.
//!
//! # Conventions
//! - Restriction entries are stored sorted, so `["B", "A"]` from the wire is kept as `["A", "B"]`.
//! - The implicit `["unbound"]` option is *not* stored; the validator adds it.
//! - Limits come from [`ClientConfig`](crate::config::ClientConfig); the backend does not send them.

use crate::binding::MappingKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `false` for NaN and infinities.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Axis parameter limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_deadzone")]
    pub deadzone: Bounds,
    #[serde(default = "default_gain")]
    pub gain: Bounds,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            deadzone: default_deadzone(),
            gain: default_gain(),
        }
    }
}

fn default_deadzone() -> Bounds {
    Bounds::new(0.0, 1.0)
}

fn default_gain() -> Bounds {
    Bounds::new(0.01, 100.0)
}

/// Snapshot of the backend's controls capabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Controller buttons usable in action mappings.
    pub buttons: Vec<String>,

    /// Controller axes usable in axis mappings.
    pub axes: Vec<String>,

    /// Control actions (button outputs).
    pub actions: Vec<String>,

    /// Plane axes (axis outputs).
    pub plane_axes: Vec<String>,

    /// Output name → permitted input combinations, each sorted.
    pub restrictions: BTreeMap<String, Vec<Vec<String>>>,

    /// Axis parameter limits.
    pub limits: Limits,
}

impl Catalog {
    /// Inserts a whitelist for `output`, sorting every combination.
    pub fn restrict<I, C, S>(&mut self, output: impl Into<String>, combos: I)
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let combos = combos
            .into_iter()
            .map(|combo| {
                let mut combo: Vec<String> = combo.into_iter().map(Into::into).collect();
                combo.sort();
                combo
            })
            .collect();
        self.restrictions.insert(output.into(), combos);
    }

    /// Output names of `kind`, in backend order.
    pub fn outputs(&self, kind: MappingKind) -> &[String] {
        match kind {
            MappingKind::Button => &self.actions,
            MappingKind::Axis => &self.plane_axes,
        }
    }

    /// Input identifiers usable for `kind`.
    pub fn inputs(&self, kind: MappingKind) -> &[String] {
        match kind {
            MappingKind::Button => &self.buttons,
            MappingKind::Axis => &self.axes,
        }
    }

    pub fn has_output(&self, kind: MappingKind, output: &str) -> bool {
        self.outputs(kind).iter().any(|o| o == output)
    }

    pub fn has_input(&self, kind: MappingKind, input: &str) -> bool {
        self.inputs(kind).iter().any(|i| i == input)
    }

    #[inline]
    pub fn restriction(&self, output: &str) -> Option<&[Vec<String>]> {
        self.restrictions.get(output).map(Vec::as_slice)
    }

    /// Restricted outputs are picked from a fixed list instead of free inputs.
    #[inline]
    pub fn is_enum(&self, output: &str) -> bool {
        self.restrictions.contains_key(output)
    }
}
