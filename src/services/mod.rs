pub mod manual_verification;
pub mod payment_verification;
