#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub frames_received: u64,
    pub calls_applied: u64,
    pub calls_rejected: u64,
    pub encode_failures: u64,
}

impl NetworkStats {
    pub(crate) fn record_sent(&mut self, bytes: usize, copies: usize) {
        self.frames_sent += copies as u64;
        self.bytes_sent += (bytes * copies) as u64;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
