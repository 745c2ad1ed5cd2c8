pub mod account;
pub mod referral;
pub mod task;

pub use account::{Account, NewAccount, UpdateAccount};
pub use referral::{NewReferral, Referral, ReferralStatus};
pub use task::{NewTask, Task, TaskTemplate};
