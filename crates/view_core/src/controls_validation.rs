//! Mandatory-field validation for form controls and submit-button enablement.

use std::sync::Arc;

use shared::domain::ControlId;
use tracing::{debug, warn};

use crate::{ControlKind, ValueState, ViewControl, ViewControlLocator};

pub struct ControlsValidation {
    locator: Arc<dyn ViewControlLocator>,
    controls: Vec<Arc<dyn ViewControl>>,
    submit_button: Option<Arc<dyn ViewControl>>,
    invalid_fields: Vec<ControlId>,
}

impl ControlsValidation {
    pub fn new(locator: Arc<dyn ViewControlLocator>) -> Self {
        Self {
            locator,
            controls: Vec::new(),
            submit_button: None,
            invalid_fields: Vec::new(),
        }
    }

    /// Resolves and tracks the given controls; unknown ids are skipped. Returns how many were added.
    pub fn add_controls(&mut self, ids: &[ControlId]) -> usize {
        let before = self.controls.len();
        for id in ids {
            match self.locator.by_id(id) {
                Some(control) => self.controls.push(control),
                None => warn!(control = %id, "control does not exist; skipping validation"),
            }
        }
        self.controls.len() - before
    }

    /// Tracks an already-resolved control, e.g. a mandatory table cell.
    pub fn add_control(&mut self, control: Arc<dyn ViewControl>) {
        self.controls.push(control);
    }

    pub fn add_submit_button(&mut self, id: &ControlId) -> bool {
        match self.locator.by_id(id) {
            Some(button) => {
                self.submit_button = Some(button);
                true
            }
            None => {
                warn!(control = %id, "submit button does not exist");
                false
            }
        }
    }

    pub fn invalid_fields(&self) -> &[ControlId] {
        &self.invalid_fields
    }

    pub fn validate_fields(&mut self) -> &[ControlId] {
        self.invalid_fields.clear();

        for control in &self.controls {
            let valid = match control.kind() {
                ControlKind::Select => control
                    .selected_item()
                    .is_some_and(|item| !is_blank(&item.key) || !is_blank(&item.text)),
                ControlKind::Input | ControlKind::TextArea | ControlKind::DatePicker => control
                    .value()
                    .is_some_and(|value| !is_blank(&value)),
                ControlKind::Button | ControlKind::Other => continue,
            };

            if valid {
                control.set_value_state(ValueState::None);
            } else {
                control.set_value_state(ValueState::Error);
                self.invalid_fields.push(control.id().clone());
            }
        }

        debug!(invalid = self.invalid_fields.len(), "fields validated");
        &self.invalid_fields
    }

    /// Enables the submit button only when the last validation found no invalid fields.
    pub fn update_submit_enablement(&self) -> bool {
        let enabled = self.invalid_fields.is_empty();
        if let Some(button) = &self.submit_button {
            button.set_enabled(enabled);
        }
        enabled
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
