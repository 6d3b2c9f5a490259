//! Locating the scanner's virtual COM port

use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Find the first USB serial port whose vendor id is `vendor_id`
///
/// Returns `Ok(None)` when no such device is attached.
pub fn resolve_port(vendor_id: u16) -> Result<Option<String>> {
    let ports = serialport::available_ports()?;
    debug!("Found {} serial ports", ports.len());

    let port = find_by_vendor(&ports, vendor_id);
    match &port {
        Some(name) => info!("Scanner found on {} (vid=0x{:04X})", name, vendor_id),
        None => warn!("No scanner detected on virtual COM (vid=0x{:04X})", vendor_id),
    }

    Ok(port)
}

fn find_by_vendor(ports: &[SerialPortInfo], vendor_id: u16) -> Option<String> {
    ports
        .iter()
        .find(|info| matches!(&info.port_type, SerialPortType::UsbPort(usb) if usb.vid == vendor_id))
        .map(|info| info.port_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb(name: &str, vid: u16) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid: 0x2210,
                serial_number: None,
                manufacturer: None,
                product: None,
            }),
        }
    }

    #[test]
    fn test_find_matching_vendor() {
        let ports = vec![
            SerialPortInfo {
                port_name: "COM1".into(),
                port_type: SerialPortType::Unknown,
            },
            usb("COM4", 0x0403),
            usb("COM7", 1529),
            usb("COM9", 1529),
        ];

        assert_eq!(find_by_vendor(&ports, 1529).as_deref(), Some("COM7"));
    }

    #[test]
    fn test_no_matching_vendor() {
        let ports = vec![usb("/dev/ttyUSB0", 0x0403)];
        assert_eq!(find_by_vendor(&ports, 1529), None);
    }
}
