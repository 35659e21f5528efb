#[cfg(feature = "chrono")]
pub mod chrono;
pub mod fixtures;
pub mod mock;
#[cfg(feature = "platform")]
pub mod platform;

pub fn is_send_sync<T: Send + Sync>(_: &T) -> bool {
    true
}
