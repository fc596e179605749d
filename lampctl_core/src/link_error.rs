//! Maps `Box<dyn Error>` from the channel trait boundary to `ChannelError`.
//!
//! `lampctl_traits::DeviceChannel` returns `Box<dyn Error + Send + Sync>`;
//! this module converts those to the typed enum, with an optional
//! feature-gated path for `lampctl_io::LinkError` downcasting.

use lampctl_traits::DeviceId;

use crate::error::ChannelError;

/// Map a channel-boundary error to a typed `ChannelError`.
///
/// Tries an already-typed `ChannelError`, then known transport errors,
/// then falls back to string heuristics.
pub fn map_link_error(e: &(dyn std::error::Error + 'static), device: DeviceId) -> ChannelError {
    if let Some(ce) = e.downcast_ref::<ChannelError>() {
        return ce.clone();
    }

    // Feature-gated: try to downcast to LinkError for precise mapping
    #[cfg(feature = "io-errors")]
    {
        use lampctl_io::error::LinkError;
        if let Some(le) = e.downcast_ref::<LinkError>() {
            let reason = le.to_string();
            return match le {
                LinkError::Write(_) => ChannelError::SendFailed { device, reason },
                _ => ChannelError::ConnectFailed { device, reason },
            };
        }
    }

    // Fallback: string-based detection
    let reason = e.to_string();
    let lower = reason.to_lowercase();
    if lower.contains("connect") || lower.contains("refused") || lower.contains("resolve") {
        ChannelError::ConnectFailed { device, reason }
    } else {
        ChannelError::SendFailed { device, reason }
    }
}
