pub mod voice_session;
