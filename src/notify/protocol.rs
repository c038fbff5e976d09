//! Surface wire protocol and raster image reconstruction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SurfaceError;
use crate::db::ConnectivityState;

/// Messages exchanged with the rendering surface.
///
/// Theme and profile travel as plain strings; the surface resolves unknown
/// names to its defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurfaceMessage {
    RenderIcon {
        theme: String,
        status: ConnectivityState,
    },
    PlaySound {
        sound: ConnectivityState,
        profile: String,
        volume: f64,
    },
    SurfaceReady,
}

/// RGBA raster with explicit dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SurfaceError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| {
                SurfaceError::MalformedReply(format!("image too large: {}x{}", width, height))
            })?;
        if data.len() != expected {
            return Err(SurfaceError::MalformedReply(format!(
                "expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Rebuild an image from a `{imageData: {width, height, data}}` reply.
    ///
    /// `data` may be a byte array or an object keyed by index ("0", "1", ...),
    /// which is what a typed array turns into after a lossy serialization.
    pub fn from_reply(reply: &Value) -> Result<Self, SurfaceError> {
        let image = reply
            .get("imageData")
            .ok_or_else(|| SurfaceError::MalformedReply("missing imageData".to_string()))?;

        let width = dimension(image, "width")?;
        let height = dimension(image, "height")?;

        let data = match image.get("data") {
            Some(Value::Array(items)) => items.iter().map(byte).collect::<Result<Vec<_>, _>>()?,
            Some(Value::Object(map)) => {
                let mut indexed = map
                    .iter()
                    .map(|(k, v)| {
                        let index = k.parse::<usize>().map_err(|_| {
                            SurfaceError::MalformedReply(format!("non-numeric pixel key {:?}", k))
                        })?;
                        Ok((index, byte(v)?))
                    })
                    .collect::<Result<Vec<_>, SurfaceError>>()?;
                indexed.sort_unstable_by_key(|(i, _)| *i);

                if indexed.iter().enumerate().any(|(pos, (i, _))| pos != *i) {
                    return Err(SurfaceError::MalformedReply("pixel keys are not contiguous".to_string()));
                }
                indexed.into_iter().map(|(_, b)| b).collect()
            }
            _ => return Err(SurfaceError::MalformedReply("missing pixel data".to_string())),
        };

        Self::new(width, height, data)
    }

    /// Serialize as the `imageData` object sent by a surface.
    pub fn to_wire(&self) -> Value {
        serde_json::json!({
            "width": self.width,
            "height": self.height,
            "data": self.data,
        })
    }
}

fn dimension(image: &Value, field: &str) -> Result<u32, SurfaceError> {
    image
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| SurfaceError::MalformedReply(format!("invalid {}", field)))
}

fn byte(value: &Value) -> Result<u8, SurfaceError> {
    value
        .as_u64()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| SurfaceError::MalformedReply(format!("pixel value out of range: {}", value)))
}
