pub mod citations;
pub mod markup;
pub mod normalize;
pub mod session;
pub mod sources;
pub mod types;

pub use markup::Trust;
pub use session::{Session, Submission, TurnOutcome};
pub use types::{ChatRequest, ChatResponse};
