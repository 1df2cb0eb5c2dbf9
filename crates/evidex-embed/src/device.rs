use candle_core::Device;

pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => {
                tracing::info!("embedding device: metal");
                return dev;
            }
            Err(e) => tracing::warn!(error = %e, "metal unavailable, using cpu"),
        }
    }
    tracing::info!("embedding device: cpu");
    Device::Cpu
}
