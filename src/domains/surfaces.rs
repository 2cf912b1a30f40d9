//! Per-surface integer settings: trim offsets and maximum deflection angles.
//!
//! Both endpoints share one shape. `GET` answers
//! `{ "AvailableSurfaces": [...], "<ValuesField>": { surface: value } }`, the
//! `POST` body and its echo are a flat `{ surface: value }` map.

use super::Field;
use crate::backends::Backend;
use crate::controller::SaveOutcome;
use crate::domain::{ConfigDomain, DomainError, DomainName};
use crate::validate::Rejection;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Trim offset in degrees, `-90..=90`.
    Trim,
    /// Maximum deflection in degrees, `0..=90`.
    MaxAngle,
}

impl SurfaceKind {
    pub fn range(&self) -> RangeInclusive<i32> {
        match self {
            SurfaceKind::Trim => -90..=90,
            SurfaceKind::MaxAngle => 0..=90,
        }
    }

    fn values_field(&self) -> &'static str {
        match self {
            SurfaceKind::Trim => "TrimValues",
            SurfaceKind::MaxAngle => "MaxSurfaceAngles",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SurfaceKind::Trim => "trim",
            SurfaceKind::MaxAngle => "max surface angle",
        }
    }
}

#[derive(Debug)]
pub struct SurfaceDomain {
    kind: SurfaceKind,
    endpoint: String,
    loaded: bool,
    // Backend order.
    surfaces: Vec<String>,
    values: BTreeMap<String, Field<i32>>,
}

impl SurfaceDomain {
    pub fn new(kind: SurfaceKind, endpoint: impl Into<String>) -> Self {
        Self {
            kind,
            endpoint: endpoint.into(),
            loaded: false,
            surfaces: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn trim(endpoint: impl Into<String>) -> Self {
        Self::new(SurfaceKind::Trim, endpoint)
    }

    pub fn max_angles(endpoint: impl Into<String>) -> Self {
        Self::new(SurfaceKind::MaxAngle, endpoint)
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn surfaces(&self) -> &[String] {
        &self.surfaces
    }

    pub fn confirmed(&self, surface: &str) -> Option<i32> {
        self.values.get(surface)?.confirmed().copied()
    }

    pub fn resolved(&self, surface: &str) -> Option<i32> {
        self.values.get(surface)?.resolved().copied()
    }

    pub fn stage(&mut self, surface: &str, value: i32) -> Result<(), Rejection> {
        let range = self.kind.range();
        if !range.contains(&value) {
            return Err(Rejection::OutOfRange {
                field: self.kind.label(),
                value: f64::from(value),
                min: f64::from(*range.start()),
                max: f64::from(*range.end()),
            });
        }
        let field = self
            .values
            .get_mut(surface)
            .ok_or_else(|| Rejection::UnknownSetting(surface.to_string()))?;
        field.stage(value);
        Ok(())
    }

    /// Resolved value of every surface.
    pub fn payload(&self) -> BTreeMap<String, i32> {
        self.surfaces
            .iter()
            .filter_map(|s| Some((s.clone(), self.resolved(s)?)))
            .collect()
    }

    fn parse_load(&self, raw: Value) -> Result<(Vec<String>, BTreeMap<String, i32>), DomainError> {
        let surfaces: Vec<String> = match raw.get("AvailableSurfaces") {
            Some(v) => serde_json::from_value(v.clone()).map_err(DomainError::malformed)?,
            None => {
                return Err(DomainError::MalformedResponse(
                    "missing AvailableSurfaces".to_string(),
                ))
            }
        };
        let field = self.kind.values_field();
        let given: BTreeMap<String, Option<i32>> = match raw.get(field) {
            Some(v) => serde_json::from_value(v.clone()).map_err(DomainError::malformed)?,
            None => return Err(DomainError::MalformedResponse(format!("missing {field}"))),
        };

        // Surfaces without a value start at 0.
        let values = surfaces
            .iter()
            .map(|s| (s.clone(), given.get(s).copied().flatten().unwrap_or(0)))
            .collect();
        Ok((surfaces, values))
    }

    fn confirm(&mut self, values: BTreeMap<String, i32>) {
        for (surface, value) in values {
            self.values.entry(surface).or_default().confirm(Some(value));
        }
    }
}

#[async_trait]
impl ConfigDomain for SurfaceDomain {
    fn name(&self) -> DomainName {
        match self.kind {
            SurfaceKind::Trim => DomainName::Trim,
            SurfaceKind::MaxAngle => DomainName::MaxSurfaceAngles,
        }
    }

    async fn load(&mut self, backend: &dyn Backend) -> Result<(), DomainError> {
        let raw = backend.get_json(&self.endpoint).await?;
        let (surfaces, values) = self.parse_load(raw)?;

        self.values.retain(|s, _| surfaces.contains(s));
        self.confirm(values);
        self.surfaces = surfaces;
        self.loaded = true;
        debug!(kind = ?self.kind, surfaces = self.surfaces.len(), "surfaces loaded");
        Ok(())
    }

    async fn save(&mut self, backend: &dyn Backend) -> Result<SaveOutcome, DomainError> {
        if !self.loaded {
            return Err(DomainError::NotLoaded);
        }
        if !self.has_pending_changes() {
            return Ok(SaveOutcome::NoChanges);
        }
        let payload = self.payload();
        debug!(kind = ?self.kind, ?payload, "surfaces payload");

        let body = serde_json::to_value(&payload).map_err(DomainError::malformed)?;
        let echo = backend
            .post_json(&self.endpoint, &body)
            .await
            .inspect_err(|e| warn!(kind = ?self.kind, error = %e, "surfaces save failed"))?;
        let echo: BTreeMap<String, i32> =
            serde_json::from_value(echo).map_err(DomainError::malformed)?;

        self.confirm(echo);
        self.discard();
        info!(kind = ?self.kind, "surfaces saved");
        Ok(SaveOutcome::Saved)
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn has_pending_changes(&self) -> bool {
        self.values.values().any(Field::is_pending)
    }

    fn discard(&mut self) {
        self.values.values_mut().for_each(Field::discard);
    }
}
