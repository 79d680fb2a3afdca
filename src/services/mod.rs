pub mod broker;
pub mod clock;
pub mod dataset;
pub mod ledger;
pub mod live;
pub mod market_data;
pub mod replay;
pub mod rng;

pub use broker::{BrokerError, BrokerService, MarginMetrics};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dataset::{DatasetError, ReplayDataset, SeriesConfig};
pub use ledger::round6;
pub use live::LiveMarketData;
pub use market_data::{provider_from_config, MarketDataError, MarketDataProvider};
pub use replay::ReplayMarketData;
pub use rng::DeterministicRng;
