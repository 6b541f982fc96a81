pub mod bar;
pub mod regime;
pub mod timeframe;

pub use bar::{PriceBar, Quote};
pub use regime::{MarketRegime, RegimeDetector};
pub use timeframe::Timeframe;
