//! Email delivery adapters.

mod logging;
mod resend;

pub use logging::LoggingEmailSender;
pub use resend::ResendEmailSender;
