pub mod openai;
pub mod reka;
pub mod stream;
