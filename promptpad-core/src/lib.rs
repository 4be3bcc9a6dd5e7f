pub mod settings;
pub mod template;
pub mod text;
pub mod types;

// Keep the public surface small and intentional.
pub use settings::*;
pub use template::*;
pub use text::*;
pub use types::*;
