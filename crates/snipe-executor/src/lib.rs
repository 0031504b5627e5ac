//! Timing-and-racing execution engine.
//!
//! Components, leaf-first:
//! - [`Signer`]: HMAC-SHA256 over sorted request parameters
//! - [`clock`]: local/exchange clock offset, one-shot sync
//! - [`Scheduler`]: hybrid sleep-then-spin deadline wait
//! - [`PriceStrategy`]: limit quote from the best ask, or market fallback
//! - [`OrderClient`]: stamp, sign, send and classify one order
//! - [`AttemptRacer`]: concurrent scheduled attempts with a shared
//!   [`SuccessFlag`]
//! - [`StagnationDetector`]: post-race top-of-book sampling
//! - [`FollowUp`]: take-profit sell

pub mod clock;
pub mod error;
pub mod follow_up;
pub mod order_client;
pub mod price;
pub mod racer;
pub mod scheduler;
pub mod signer;
pub mod stagnation;

pub use clock::{synchronize, Clock, ClockOffset, DynClock, MockClock, SystemClock};
pub use error::{ExecutorError, ExecutorResult};
pub use follow_up::{FollowUp, FollowUpReport, TakeProfit};
pub use order_client::{AttemptSlot, OrderClient, PreparedOrder};
pub use price::{OrderMode, PriceQuote, PriceStrategy};
pub use racer::{AttemptRacer, SuccessFlag};
pub use scheduler::{Scheduler, WaitOutcome, DEFAULT_SPIN_THRESHOLD};
pub use signer::Signer;
pub use stagnation::{StagnationConfig, StagnationDetector, StagnationVerdict};
