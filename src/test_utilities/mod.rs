pub mod mocks;

use crate::gateway::BlockchainGateway;
use crate::networking::router::BchRpcRouter;
use crate::rate_limit::RateLimiter;
use crate::use_cases::BchUseCases;
use std::sync::Arc;

pub const TEST_NODE_ID: &str = "QmTestNode";

/// Router over `gateway` with the given rate limit, reporting as
/// [`TEST_NODE_ID`].
pub fn make_test_router(gateway: Arc<dyn BlockchainGateway>, max_requests: u32) -> BchRpcRouter {
    BchRpcRouter::new(
        Arc::new(BchUseCases::new(gateway)),
        Arc::new(RateLimiter::new(max_requests, 60_000)),
        String::from(TEST_NODE_ID),
    )
}
