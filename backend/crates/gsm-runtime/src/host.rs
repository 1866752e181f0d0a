/// Facts about the machine the manager runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub is_64bit_os: bool,
}

impl HostPlatform {
    pub fn detect() -> Self {
        Self {
            is_64bit_os: cfg!(target_pointer_width = "64") || running_under_wow64(),
        }
    }
}

/// A 32-bit build on 64-bit Windows sees the native architecture here.
#[cfg(windows)]
fn running_under_wow64() -> bool {
    std::env::var_os("PROCESSOR_ARCHITEW6432").is_some()
}

#[cfg(not(windows))]
fn running_under_wow64() -> bool {
    false
}
