//! Radio link settings: channel, power amplifier level, plane feedback.

use super::Field;
use crate::backends::Backend;
use crate::controller::SaveOutcome;
use crate::domain::{ConfigDomain, DomainError, DomainName};
use crate::validate::Rejection;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

pub const CHANNEL_RANGE: RangeInclusive<u8> = 0..=125;
pub const PA_LEVEL_RANGE: RangeInclusive<u8> = 0..=3;

/// Radio record as sent and received by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioSettings {
    #[serde(rename = "Channel")]
    pub channel: u8,
    #[serde(rename = "PALevel")]
    pub pa_level: u8,
    #[serde(rename = "IsPlaneFeedbackEnabled")]
    pub feedback: bool,
}

#[derive(Debug, Default)]
pub struct RadioDomain {
    endpoint: String,
    channel: Field<u8>,
    pa_level: Field<u8>,
    feedback: Field<bool>,
}

impl RadioDomain {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Staged values over confirmed. `None` before the first load.
    pub fn resolved(&self) -> Option<RadioSettings> {
        Some(RadioSettings {
            channel: *self.channel.resolved()?,
            pa_level: *self.pa_level.resolved()?,
            feedback: *self.feedback.resolved()?,
        })
    }

    pub fn confirmed(&self) -> Option<RadioSettings> {
        Some(RadioSettings {
            channel: *self.channel.confirmed()?,
            pa_level: *self.pa_level.confirmed()?,
            feedback: *self.feedback.confirmed()?,
        })
    }

    pub fn stage_channel(&mut self, channel: u8) -> Result<(), Rejection> {
        check("channel", channel, &CHANNEL_RANGE)?;
        self.channel.stage(channel);
        Ok(())
    }

    pub fn stage_pa_level(&mut self, level: u8) -> Result<(), Rejection> {
        check("power amp level", level, &PA_LEVEL_RANGE)?;
        self.pa_level.stage(level);
        Ok(())
    }

    pub fn stage_feedback(&mut self, enabled: bool) {
        self.feedback.stage(enabled);
    }

    fn confirm(&mut self, settings: RadioSettings) {
        self.channel.confirm(Some(settings.channel));
        self.pa_level.confirm(Some(settings.pa_level));
        self.feedback.confirm(Some(settings.feedback));
    }
}

fn check(field: &'static str, value: u8, range: &RangeInclusive<u8>) -> Result<(), Rejection> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Rejection::OutOfRange {
            field,
            value: f64::from(value),
            min: f64::from(*range.start()),
            max: f64::from(*range.end()),
        })
    }
}

#[async_trait]
impl ConfigDomain for RadioDomain {
    fn name(&self) -> DomainName {
        DomainName::Radio
    }

    async fn load(&mut self, backend: &dyn Backend) -> Result<(), DomainError> {
        let raw = backend.get_json(&self.endpoint).await?;
        let settings: RadioSettings = serde_json::from_value(raw).map_err(DomainError::malformed)?;
        self.confirm(settings);
        debug!(?settings, "radio loaded");
        Ok(())
    }

    async fn save(&mut self, backend: &dyn Backend) -> Result<SaveOutcome, DomainError> {
        let payload = self.resolved().ok_or(DomainError::NotLoaded)?;
        if !self.has_pending_changes() {
            return Ok(SaveOutcome::NoChanges);
        }
        debug!(?payload, "radio payload");

        let body = serde_json::to_value(payload).map_err(DomainError::malformed)?;
        let echo = backend
            .post_json(&self.endpoint, &body)
            .await
            .inspect_err(|e| warn!(error = %e, "radio save failed"))?;
        let echo: RadioSettings = serde_json::from_value(echo).map_err(DomainError::malformed)?;

        self.confirm(echo);
        self.discard();
        info!("radio saved");
        Ok(SaveOutcome::Saved)
    }

    fn is_loaded(&self) -> bool {
        self.confirmed().is_some()
    }

    fn has_pending_changes(&self) -> bool {
        self.channel.is_pending() || self.pa_level.is_pending() || self.feedback.is_pending()
    }

    fn discard(&mut self) {
        self.channel.discard();
        self.pa_level.discard();
        self.feedback.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryBackend;
    use serde_json::json;

    const ENDPOINT: &str = "/settings/radio/";

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.set_document(
            ENDPOINT,
            json!({ "Channel": 76, "PALevel": 1, "IsPlaneFeedbackEnabled": true }),
        );
        backend
    }

    #[tokio::test]
    async fn test_load_stage_save() {
        let backend = backend();
        let mut radio = RadioDomain::new(ENDPOINT);
        radio.load(&backend).await.unwrap();
        assert!(!radio.has_pending_changes());

        radio.stage_channel(100).unwrap();
        radio.stage_feedback(false);
        assert!(radio.has_pending_changes());

        assert_eq!(radio.save(&backend).await.unwrap(), SaveOutcome::Saved);
        assert_eq!(
            backend.posts(ENDPOINT),
            vec![json!({ "Channel": 100, "PALevel": 1, "IsPlaneFeedbackEnabled": false })]
        );
        assert_eq!(radio.confirmed().map(|r| r.channel), Some(100));
        assert!(!radio.has_pending_changes());
    }

    #[tokio::test]
    async fn test_out_of_range_is_rejected() {
        let backend = backend();
        let mut radio = RadioDomain::new(ENDPOINT);
        radio.load(&backend).await.unwrap();

        assert!(matches!(
            radio.stage_channel(126),
            Err(Rejection::OutOfRange { field: "channel", .. })
        ));
        assert!(radio.stage_pa_level(4).is_err());
        assert!(!radio.has_pending_changes());
        assert_eq!(radio.save(&backend).await.unwrap(), SaveOutcome::NoChanges);
        assert!(backend.posts(ENDPOINT).is_empty());
    }

    #[tokio::test]
    async fn test_save_before_load() {
        let mut radio = RadioDomain::new(ENDPOINT);
        radio.stage_channel(3).unwrap();
        assert_eq!(
            radio.save(&MemoryBackend::new()).await,
            Err(DomainError::NotLoaded)
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let backend = MemoryBackend::new();
        backend.set_document(ENDPOINT, json!({ "Channel": "seventy" }));
        let mut radio = RadioDomain::new(ENDPOINT);
        assert!(matches!(
            radio.load(&backend).await,
            Err(DomainError::MalformedResponse(_))
        ));
        assert!(!radio.is_loaded());
    }
}
