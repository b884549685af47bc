//! Bounded browser session pool.
//!
//! The pool exclusively owns session contexts and their child pages; callers
//! borrow page handles without taking ownership. Admission past capacity
//! evicts the least-recently-used session, and a background sweep reaps
//! sessions idle past the configured threshold.

mod engine;
mod errors;
mod model;
mod pool;

pub use engine::{BrowserEngine, PageContent, StubEngine};
pub use errors::PoolError;
pub use model::{LifeState, NavigateOptions, PageCtx, PoolConfig, SessionCtx};
pub use pool::SessionPool;
