pub mod session;

pub use session::SessionAligner;
