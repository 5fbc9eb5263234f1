//! Domain entities, ports, and use-case services.
//!
//! Everything in here is transport and storage agnostic. Entities carry their
//! serde contracts (the JSON document shape shared by the HTTP layer and the
//! document store); services depend only on the [`ports::ForumStore`] trait.

pub mod accounts;
pub mod answer;
pub mod answers;
pub mod error;
pub mod guard;
pub mod notification;
pub mod notifications;
pub mod ports;
pub mod question;
pub mod questions;
pub mod user;
pub mod votes;

pub use self::accounts::{AccountsApi, AccountsService};
pub use self::answer::{Answer, AnswerId};
pub use self::answers::{AnswersApi, AnswersService};
pub use self::error::{Error, ErrorCode};
pub use self::notification::{Notification, NotificationId};
pub use self::notifications::{NotificationsApi, NotificationsService};
pub use self::question::{Question, QuestionId};
pub use self::questions::{QuestionsApi, QuestionsService};
pub use self::user::{User, UserCounters, UserId};
pub use self::votes::{VoteDirection, VoteSets};
