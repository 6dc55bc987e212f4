//! # Heading Provider
//!
//! Turns raw device orientation readings into a single compass heading.
//!
//! Platforms report either a direct magnetic heading (preferred) or a
//! relative rotation `alpha` measured counter-clockwise, which is converted
//! with `360 - alpha`. Some platforms gate the orientation feed behind an
//! explicit, asynchronous permission request; the provider keeps that gate
//! and the listener attachment as two separate steps.

use log::{debug, info, warn};
use thiserror::Error;

use crate::geo_utils::normalize_degrees;
use crate::{BacktrackError, Coordinate};

/// One event from the orientation feed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationReading {
    /// Degrees clockwise from magnetic north
    pub compass_heading: Option<f64>,
    /// Degrees of rotation about the vertical axis, counter-clockwise
    pub relative_rotation: Option<f64>,
}

impl OrientationReading {
    pub fn compass(heading: f64) -> Self {
        Self {
            compass_heading: Some(heading),
            relative_rotation: None,
        }
    }

    pub fn rotation(alpha: f64) -> Self {
        Self {
            compass_heading: None,
            relative_rotation: Some(alpha),
        }
    }

    /// Compass heading in `[0, 360)` carried by this reading, if any.
    pub fn to_heading(&self) -> Option<f64> {
        if let Some(heading) = self.compass_heading {
            return Some(normalize_degrees(heading));
        }
        self.relative_rotation
            .map(|alpha| normalize_degrees(360.0 - alpha))
    }
}

/// Why the heading is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum HeadingError {
    #[error("Device orientation is not supported by this device")]
    NotSupported,
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Error requesting permission")]
    PermissionRequestFailed,
}

impl From<HeadingError> for BacktrackError {
    fn from(err: HeadingError) -> Self {
        let sensor = "orientation".to_string();
        match err {
            HeadingError::NotSupported => BacktrackError::SensorUnsupported { sensor },
            HeadingError::PermissionDenied | HeadingError::PermissionRequestFailed => {
                BacktrackError::PermissionDenied { sensor }
            }
        }
    }
}

/// Answer to an orientation permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResponse {
    Granted,
    Denied,
}

/// The platform side of the orientation feed.
///
/// `attach` starts delivering readings to the provider (the host forwards
/// them through [`HeadingProvider::handle_reading`]); `detach` stops it.
#[allow(async_fn_in_trait)]
pub trait OrientationPlatform {
    /// Whether the device has an orientation sensor at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Whether a permission grant is required before `attach`.
    fn requires_permission(&self) -> bool;

    /// Prompt for permission. `Err` means the request itself failed.
    async fn request_permission(&mut self) -> std::result::Result<PermissionResponse, String>;

    fn attach(&mut self);

    fn detach(&mut self);
}

/// Best-effort compass heading, fed by an [`OrientationPlatform`].
pub struct HeadingProvider<P: OrientationPlatform> {
    platform: P,
    heading: Option<f64>,
    error: Option<HeadingError>,
    granted: bool,
    attached: bool,
}

impl<P: OrientationPlatform> HeadingProvider<P> {
    /// Create a provider. Ungated platforms are attached immediately.
    pub fn new(platform: P) -> Self {
        let mut provider = Self {
            platform,
            heading: None,
            error: None,
            granted: false,
            attached: false,
        };

        if !provider.platform.is_supported() {
            info!("[HeadingProvider] Orientation not supported");
            provider.error = Some(HeadingError::NotSupported);
        } else if !provider.platform.requires_permission() {
            provider.granted = true;
            provider.attach();
        }
        provider
    }

    /// Ask the platform for permission; attaches the listener on grant.
    ///
    /// Returns whether the heading feed is now allowed. Failures are kept as
    /// [`Self::error`] rather than returned.
    pub async fn request_permission(&mut self) -> bool {
        if !self.platform.is_supported() {
            self.error = Some(HeadingError::NotSupported);
            return false;
        }
        if !self.platform.requires_permission() {
            self.granted = true;
            self.attach();
            return true;
        }

        match self.platform.request_permission().await {
            Ok(PermissionResponse::Granted) => {
                info!("[HeadingProvider] Permission granted");
                self.granted = true;
                self.error = None;
                self.attach();
                true
            }
            Ok(PermissionResponse::Denied) => {
                warn!("[HeadingProvider] Permission denied");
                self.error = Some(HeadingError::PermissionDenied);
                false
            }
            Err(message) => {
                warn!("[HeadingProvider] Permission request failed: {}", message);
                self.error = Some(HeadingError::PermissionRequestFailed);
                false
            }
        }
    }

    /// Attach the listener. Only allowed once permission is granted (or the
    /// platform is ungated).
    pub fn start(&mut self) -> Result<(), HeadingError> {
        if !self.platform.is_supported() {
            return Err(HeadingError::NotSupported);
        }
        if !self.granted {
            return Err(HeadingError::PermissionDenied);
        }
        self.attach();
        Ok(())
    }

    /// Detach the listener. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.attached {
            self.platform.detach();
            self.attached = false;
            debug!("[HeadingProvider] Listener detached");
        }
    }

    fn attach(&mut self) {
        if !self.attached {
            self.platform.attach();
            self.attached = true;
            debug!("[HeadingProvider] Listener attached");
        }
    }

    /// Feed one orientation event. Ignored while detached.
    pub fn handle_reading(&mut self, reading: &OrientationReading) -> Option<f64> {
        if !self.attached {
            return self.heading;
        }
        if let Some(heading) = reading.to_heading() {
            self.heading = Some(heading);
        }
        self.heading
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    pub fn error(&self) -> Option<HeadingError> {
        self.error
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }
}

impl<P: OrientationPlatform> Drop for HeadingProvider<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Heading used for rendering: compass first, then the fix's own course,
/// then north-up.
pub fn resolve_heading(compass: Option<f64>, sample: Option<&Coordinate>) -> f64 {
    compass
        .or_else(|| sample.and_then(|s| s.heading))
        .unwrap_or(0.0)
}
