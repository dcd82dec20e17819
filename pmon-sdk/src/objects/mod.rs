pub mod feed;
pub mod notification;
pub mod payloads;

pub use feed::{ClobAuth, FeedMessage, FeedTopic, Subscription, SubscriptionAction, SubscriptionRequest};
pub use notification::{NotificationTrigger, Priority, TriggerKind};
pub use payloads::{ActivityTrade, ConditionResolution, CryptoPrice, MarketPriceChange, UserPosition};
