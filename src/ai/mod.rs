pub mod authorization;
pub mod client;
pub mod extract;
pub mod screening;

pub use authorization::{AuthorizationDecision, AuthorizationStage};
pub use client::AiClient;
pub use screening::{ScreeningRanking, ScreeningStage, TickerRanking};
