use crate::backends::Backend;
use crate::controller::{ControlsController, SaveOutcome, SaveScope};
use crate::domain::{ConfigDomain, DomainError, DomainName};
use async_trait::async_trait;

/// The controls panel as a settings domain. Saves use the controller's default scope.
#[async_trait]
impl ConfigDomain for ControlsController {
    fn name(&self) -> DomainName {
        DomainName::Controls
    }

    async fn load(&mut self, backend: &dyn Backend) -> Result<(), DomainError> {
        ControlsController::load(self, backend).await?;
        Ok(())
    }

    async fn save(&mut self, backend: &dyn Backend) -> Result<SaveOutcome, DomainError> {
        let scope = self.default_scope().clone();
        Ok(ControlsController::save(self, backend, &scope).await?)
    }

    fn is_loaded(&self) -> bool {
        ControlsController::is_loaded(self)
    }

    fn has_pending_changes(&self) -> bool {
        ControlsController::has_pending_changes(self, &SaveScope::AllRoles)
    }

    fn discard(&mut self) {
        self.discard_all();
    }
}
