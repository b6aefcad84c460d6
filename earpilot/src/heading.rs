use earpilot_traits::HeadingSource;

/// Subtracts the mount offset from a compass or course heading and wraps the
/// result into [0, 360).
///
/// The offset is bounded to ±45°, so once the raw heading is itself in range a
/// single wrap in either direction is enough.
pub fn resolve_heading(raw_degrees: f64, mount_offset: f64) -> f64 {
    let mut heading = raw_degrees.rem_euclid(360.0) - mount_offset;
    if heading < 0.0 {
        heading += 360.0;
    } else if heading >= 360.0 {
        heading -= 360.0;
    }
    heading
}

/// Tracks the latest heading from the preferred source.
#[derive(Debug, Clone)]
pub struct HeadingResolver {
    preferred: HeadingSource,
    heading: f64,
    timestamp: Option<f64>,
}

impl HeadingResolver {
    pub fn new(preferred: HeadingSource) -> Self {
        HeadingResolver {
            preferred,
            heading: 0.0,
            timestamp: None,
        }
    }

    pub fn accepts(&self, source: HeadingSource) -> bool {
        source == self.preferred
    }

    pub fn preferred(&self) -> HeadingSource {
        self.preferred
    }

    /// Resolves a sample from the preferred source. Samples from any other
    /// source are ignored and return `None`.
    pub fn update(
        &mut self,
        raw_degrees: f64,
        timestamp: f64,
        source: HeadingSource,
        mount_offset: f64,
    ) -> Option<f64> {
        if !self.accepts(source) {
            return None;
        }
        self.heading = resolve_heading(raw_degrees, mount_offset);
        self.timestamp = Some(timestamp);
        Some(self.heading)
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    pub fn reset(&mut self) {
        self.heading = 0.0;
        self.timestamp = None;
    }
}
