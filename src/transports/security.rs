//! Transport limits

/// Default cap on request body size: 1 MB
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Security configuration shared by transports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes (0 = unlimited)
    pub max_request_size: usize,
}

impl SecurityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum request body size (0 = unlimited)
    pub fn max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }

    /// Body limit to enforce when reading a request
    pub fn body_limit(&self) -> usize {
        match self.max_request_size {
            0 => usize::MAX,
            n => n,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
        }
    }
}
