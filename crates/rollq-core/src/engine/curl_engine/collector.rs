//! Easy2 handler that buffers a whole response: header lines and body kept
//! apart so the combined output always starts with the complete header block.

/// Handler state for one transfer. Implements curl's Handler for Easy2.
#[derive(Debug, Default)]
pub(super) struct Collector {
    pub(super) headers: Vec<u8>,
    pub(super) body: Vec<u8>,
}

impl Collector {
    pub(super) fn clear(&mut self) {
        self.headers.clear();
        self.body.clear();
    }

    /// Header block followed by body, leaving the collector empty.
    pub(super) fn take_output(&mut self) -> Vec<u8> {
        let mut output = std::mem::take(&mut self.headers);
        output.append(&mut self.body);
        output
    }
}

impl curl::easy::Handler for Collector {
    fn header(&mut self, data: &[u8]) -> bool {
        self.headers.extend_from_slice(data);
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        self.body.extend_from_slice(data);
        Ok(data.len())
    }
}
