//! Platform-specific metadata handling.

#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub use windows::PlatformMetadata;

#[cfg(unix)]
pub use unix::PlatformMetadata;

/// Check if the current process has administrator privileges.
///
/// Permission bits are not enforced for such a process.
#[cfg(unix)]
pub fn has_admin_privileges() -> bool {
    // On Unix, check if EUID is 0 (root)
    nix::unistd::geteuid() == nix::unistd::Uid::from_raw(0)
}
