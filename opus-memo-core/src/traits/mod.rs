pub mod audio_device;
pub mod session_delegate;
