#[cfg(test)]
mod error_tests {
    use crabctrl::errors::{errno_of, ConfigError, DeviceError, Errno};
    use std::error::Error;
    use std::path::PathBuf;

    #[test]
    fn test_open_error_display() {
        let error = DeviceError::Open {
            path: PathBuf::from("/dev/video7"),
            errno: Errno::ENOENT,
        };
        let text = error.to_string();
        assert!(text.contains("failed to open V4L2 device /dev/video7"), "{text}");
        assert_eq!(error.errno(), Some(Errno::ENOENT));
        assert_eq!(error.to_errno(), -(Errno::ENOENT as i32));
    }

    #[test]
    fn test_enumeration_error() {
        let error = DeviceError::Enumeration(Errno::EIO);
        assert!(error.to_string().starts_with("failed to enumerate controls"));
        assert_eq!(error.to_errno(), -(Errno::EIO as i32));
        assert_eq!(error.failed_control(), None);
    }

    #[test]
    fn test_unknown_control_display() {
        let error = DeviceError::UnknownControl(9999);
        assert_eq!(error.to_string(), "control 0x0000270f not found");
        assert_eq!(error.failed_control(), Some(9999));
    }

    #[test]
    fn test_invalid_value() {
        let error = DeviceError::invalid_value(0x0098_0900, "expected 4 elements, got 3");
        assert_eq!(
            error.to_string(),
            "invalid value for control 0x00980900: expected 4 elements, got 3"
        );
        assert_eq!(error.to_errno(), -(Errno::EINVAL as i32));
    }

    #[test]
    fn test_device_error_debug_format() {
        let error = DeviceError::Ioctl {
            errno: Errno::EBUSY,
            control: None,
        };
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Ioctl"));
        assert!(debug_str.contains("EBUSY"), "{debug_str}");
    }

    #[test]
    fn test_errno_from_io_error() {
        let err = std::io::Error::from_raw_os_error(Errno::ENODEV as i32);
        assert_eq!(errno_of(&err), Errno::ENODEV);

        let custom = std::io::Error::new(std::io::ErrorKind::Other, "no errno");
        assert_eq!(errno_of(&custom), Errno::EIO);
    }

    #[test]
    fn test_config_error_source() {
        let parse = toml::from_str::<toml::Table>("= broken").unwrap_err();
        let error = ConfigError::from(parse);
        assert!(error.to_string().starts_with("failed to parse config file"));
        assert!(error.source().is_some());

        let read = ConfigError::Read(std::io::Error::from(Errno::EACCES));
        assert!(read.source().is_some());
    }

    #[test]
    fn test_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<DeviceError>();
        assert_send_sync::<ConfigError>();
    }
}
