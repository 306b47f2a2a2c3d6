//! NVENC backend availability probe.

// Conditional compilation for NVENC support
#[cfg(all(windows, feature = "nvenc"))]
mod imp {
    use nvidia_video_codec_sdk::safe::api::ENCODE_API;
    use std::sync::OnceLock;
    use tracing::{debug, info};

    static NVENC_AVAILABLE: OnceLock<bool> = OnceLock::new();

    pub fn probe() -> bool {
        *NVENC_AVAILABLE.get_or_init(|| {
            // Locking the API table is the cheapest call that fails
            // when no NVENC-capable driver is present.
            match ENCODE_API.lock() {
                Ok(_) => {
                    info!("NVENC API available");
                    true
                }
                Err(e) => {
                    debug!("NVENC not available: {:?}", e);
                    false
                }
            }
        })
    }
}

#[cfg(not(all(windows, feature = "nvenc")))]
mod imp {
    pub fn probe() -> bool {
        tracing::debug!("NVENC support not compiled in (requires Windows + nvenc feature)");
        false
    }
}

/// Whether an NVENC session can be opened on this machine.
pub fn nvenc_available() -> bool {
    imp::probe()
}

/// Whether NVENC support is compiled into this build.
pub fn compiled_with_nvenc() -> bool {
    cfg!(all(windows, feature = "nvenc"))
}
