use std::fmt;

/// One measurement stream: a physical meter serial plus the register (stream code)
/// it reports, e.g. import vs. export on the same device.
///
/// Identities compare field by field, so no separator can make two different
/// `(serial, stream_code)` pairs collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterIdentity {
    pub serial: String,
    pub stream_code: String,
}

impl MeterIdentity {
    pub fn new(serial: impl Into<String>, stream_code: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            stream_code: stream_code.into(),
        }
    }

    /// Human-readable label, `"<serial> (<stream_code>)"`. For display only.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MeterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.serial, self.stream_code)
    }
}
