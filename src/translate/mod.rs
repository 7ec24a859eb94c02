pub mod interface;
pub mod client;

pub use interface::{TranslateRequest, TranslateResponse, Translator};
pub use client::LingvaTranslator;
