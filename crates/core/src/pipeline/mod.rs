pub mod editor_session;
pub mod redact_image_use_case;
