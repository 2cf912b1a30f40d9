//! [`ConfigDomain`](crate::domain::ConfigDomain) implementations.

pub mod controls;
pub mod radio;
pub mod serial_port;
pub mod surfaces;

pub use radio::{RadioDomain, RadioSettings};
pub use serial_port::{SerialPortDomain, SerialPortParameters};
pub use surfaces::{SurfaceDomain, SurfaceKind};

/// One confirmed value and its optional staged override.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Field<T> {
    confirmed: Option<T>,
    staged: Option<T>,
}

impl<T: Clone + PartialEq> Field<T> {
    pub(crate) fn confirmed(&self) -> Option<&T> {
        self.confirmed.as_ref()
    }

    /// Staged value, else confirmed.
    pub(crate) fn resolved(&self) -> Option<&T> {
        self.staged.as_ref().or(self.confirmed.as_ref())
    }

    /// Stages `value`; a value equal to confirmed clears the override.
    pub(crate) fn stage(&mut self, value: T) {
        if self.confirmed.as_ref() == Some(&value) {
            self.staged = None;
        } else {
            self.staged = Some(value);
        }
    }

    pub(crate) fn confirm(&mut self, value: Option<T>) {
        self.confirmed = value;
    }

    pub(crate) fn is_pending(&self) -> bool {
        match &self.staged {
            Some(staged) => self.confirmed.as_ref() != Some(staged),
            None => false,
        }
    }

    pub(crate) fn discard(&mut self) {
        self.staged = None;
    }
}
