//! Status indicator sink: a rendered icon, or a text badge fallback.

use serde::Serialize;
use std::sync::RwLock;

use super::ImageBuffer;
use crate::db::ConnectivityState;

/// Colored text shown when no icon could be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub text: &'static str,
    pub color: &'static str,
}

impl Badge {
    pub fn for_state(state: ConnectivityState) -> Self {
        match state {
            ConnectivityState::Online => Self { text: "ON", color: "#10B981" },
            ConnectivityState::LanNoInternet => Self { text: "!", color: "#F59E0B" },
            ConnectivityState::Offline => Self { text: "OFF", color: "#EF4444" },
        }
    }
}

pub trait Indicator: Send + Sync {
    /// Show `image` and clear any badge.
    fn set_icon(&self, image: &ImageBuffer);

    fn set_badge(&self, badge: &Badge);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IndicatorState {
    #[default]
    Empty,
    #[serde(rename_all = "camelCase")]
    Icon {
        width: u32,
        height: u32,
        #[serde(skip)]
        data: Vec<u8>,
    },
    Badge {
        text: String,
        color: String,
    },
}

/// In-memory indicator read by the control API.
#[derive(Debug, Default)]
pub struct SharedIndicator {
    state: RwLock<IndicatorState>,
}

impl SharedIndicator {
    pub fn snapshot(&self) -> IndicatorState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn replace(&self, next: IndicatorState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }
}

impl Indicator for SharedIndicator {
    fn set_icon(&self, image: &ImageBuffer) {
        self.replace(IndicatorState::Icon {
            width: image.width,
            height: image.height,
            data: image.data.clone(),
        });
    }

    fn set_badge(&self, badge: &Badge) {
        self.replace(IndicatorState::Badge {
            text: badge.text.to_string(),
            color: badge.color.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_replaces_badge() {
        let indicator = SharedIndicator::default();
        assert_eq!(indicator.snapshot(), IndicatorState::Empty);

        indicator.set_badge(&Badge::for_state(ConnectivityState::Offline));
        assert_eq!(
            serde_json::to_value(indicator.snapshot()).unwrap(),
            serde_json::json!({"kind": "badge", "text": "OFF", "color": "#EF4444"})
        );

        indicator.set_icon(&ImageBuffer::new(1, 1, vec![0, 0, 0, 255]).unwrap());
        assert!(matches!(indicator.snapshot(), IndicatorState::Icon { width: 1, height: 1, .. }));
    }
}
