pub mod mock_referral_api;
pub mod test_logging;

pub use mock_referral_api::MockReferralApi;
pub use test_logging::init_test_logging;
