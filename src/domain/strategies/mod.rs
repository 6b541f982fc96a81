pub mod breakout;
pub mod mean_reversion;
pub mod momentum;
pub mod traits;

pub use breakout::BreakoutStrategy;
pub use mean_reversion::MeanReversionStrategy;
pub use momentum::MomentumStrategy;
pub use traits::{Strategy, StrategyInput};
