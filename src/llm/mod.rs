pub mod groq;
pub mod media;
pub mod types;

pub use groq::GroqClient;
pub use media::ImagePayload;

#[cfg(test)]
pub mod testing;
