pub mod letter;
pub mod mailer;
pub mod delivery;

pub use mailer::{Mailer, SmtpMailer};
pub use delivery::deliver_all;
