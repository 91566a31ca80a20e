use crate::midi::DeviceKind;

/// Resolve a configured device-kind tag.
///
/// Unknown tags fall back to [`DeviceKind::Colorful`] so configs written by
/// newer versions still drive a device.
pub fn device_for(tag: &str) -> DeviceKind {
    match tag.trim().to_ascii_lowercase().as_str() {
        "classic" => DeviceKind::Classic,
        "colorful" => DeviceKind::Colorful,
        "generic" => DeviceKind::Generic,
        other => {
            if !other.is_empty() {
                log::debug!("Unknown device type '{}', using colorful", other);
            }
            DeviceKind::Colorful
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags() {
        assert_eq!(device_for("classic"), DeviceKind::Classic);
        assert_eq!(device_for("Colorful"), DeviceKind::Colorful);
        assert_eq!(device_for("generic"), DeviceKind::Generic);
    }

    #[test]
    fn test_unknown_falls_back_to_colorful() {
        assert_eq!(device_for("launchpad-pro-mk4"), DeviceKind::Colorful);
        assert_eq!(device_for(""), DeviceKind::Colorful);
    }
}
