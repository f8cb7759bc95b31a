use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use serde::Deserialize;
use tokio::sync::watch;
use tracing::debug;

pub trait BusyIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Shows the indicator on creation and hides it exactly once when dropped.
#[must_use = "the busy indicator hides as soon as the scope is dropped"]
pub struct BusyScope {
    indicator: Arc<dyn BusyIndicator>,
}

impl BusyScope {
    pub fn enter(indicator: Arc<dyn BusyIndicator>) -> Self {
        indicator.show();
        Self { indicator }
    }

    pub fn release(self) {}
}

impl Drop for BusyScope {
    fn drop(&mut self) {
        self.indicator.hide();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyIndicatorSize {
    #[default]
    Auto,
    Small,
    Medium,
    Large,
}

impl FromStr for BusyIndicatorSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BusyIndicatorSize::Auto),
            "small" => Ok(BusyIndicatorSize::Small),
            "medium" => Ok(BusyIndicatorSize::Medium),
            "large" => Ok(BusyIndicatorSize::Large),
            other => Err(format!("unknown busy indicator size '{other}'")),
        }
    }
}

impl fmt::Display for BusyIndicatorSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BusyIndicatorSize::Auto => "auto",
            BusyIndicatorSize::Small => "small",
            BusyIndicatorSize::Medium => "medium",
            BusyIndicatorSize::Large => "large",
        };
        f.write_str(name)
    }
}

/// Modal busy dialog state. Rendering code subscribes to the visibility channel
/// and applies `delay` before actually drawing the dialog.
pub struct BusyDialog {
    delay: Duration,
    size: BusyIndicatorSize,
    visible: watch::Sender<bool>,
}

impl BusyDialog {
    pub fn new(delay: Duration, size: BusyIndicatorSize) -> Self {
        let (visible, _) = watch::channel(false);
        Self {
            delay,
            size,
            visible,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn size(&self) -> BusyIndicatorSize {
        self.size
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }
}

impl Default for BusyDialog {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000), BusyIndicatorSize::Auto)
    }
}

impl BusyIndicator for BusyDialog {
    fn show(&self) {
        debug!(delay_ms = self.delay.as_millis() as u64, size = %self.size, "busy dialog open");
        self.visible.send_replace(true);
    }

    fn hide(&self) {
        debug!("busy dialog close");
        self.visible.send_replace(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_toggles_dialog_visibility() {
        let dialog = Arc::new(BusyDialog::default());
        let rx = dialog.subscribe();

        let scope = BusyScope::enter(dialog.clone());
        assert!(dialog.is_visible());
        assert!(*rx.borrow());

        scope.release();
        assert!(!dialog.is_visible());
        assert!(!*rx.borrow());
    }

    #[test]
    fn scope_hides_on_early_drop() {
        let dialog = Arc::new(BusyDialog::default());
        {
            let _scope = BusyScope::enter(dialog.clone());
            assert!(dialog.is_visible());
        }
        assert!(!dialog.is_visible());
    }

    #[test]
    fn size_parses_case_insensitively() {
        assert_eq!("Large".parse::<BusyIndicatorSize>(), Ok(BusyIndicatorSize::Large));
        assert!("huge".parse::<BusyIndicatorSize>().is_err());
    }
}
